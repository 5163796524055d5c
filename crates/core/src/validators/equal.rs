use serde::Deserialize;
use serde_yaml::Value;

use super::{diff, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Passes when the value at `path` deeply equals `value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EqualValidator {
    #[serde(default)]
    pub path: ValuePath,
    #[serde(default)]
    pub value: Value,
}

impl EqualValidator {
    fn fail_info(&self, actual: &Value, negative: bool) -> Vec<String> {
        let expected = to_yaml(&self.value);
        let info = FailInfo::new().inline("Path:", self.path.as_str());

        if negative {
            return info.block("Expected NOT to equal:", &expected).build();
        }

        let actual = to_yaml(actual);
        info.block("Expected:", &expected)
            .block("Actual:", &actual)
            .block("Diff:", &diff(&expected, &actual))
            .build()
    }
}

impl Validate for EqualValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        if (*actual == self.value) != context.negative {
            Validation::pass()
        } else {
            Validation::fail(self.fail_info(actual, context.negative))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{manifest, run};
    use super::*;

    const DOC: &str = "
a:
  b:
    - c: 123
";

    fn validator(path: &str, value: &str) -> EqualValidator {
        EqualValidator {
            path: ValuePath::parse(path).unwrap(),
            value: serde_yaml::from_str(value).unwrap(),
        }
    }

    #[test]
    fn test_pass_when_equal() {
        let docs = vec![manifest(DOC)];
        assert_eq!(run(&validator("a.b[0].c", "123"), &docs, false), Validation::pass());
    }

    #[test]
    fn test_pass_when_equal_whole_subtree() {
        let docs = vec![manifest(DOC)];
        let v = validator("a.b", "[{c: 123}]");
        assert!(run(&v, &docs, false).passed);
    }

    #[test]
    fn test_fail_with_diff() {
        let docs = vec![manifest(DOC)];
        let v = validator("a.b[0]", "d: 321");
        let validation = run(&v, &docs, false);

        assert!(!validation.passed);
        assert_eq!(
            validation.info,
            vec![
                "Path:\ta.b[0]",
                "Expected:",
                "\td: 321",
                "Actual:",
                "\tc: 123",
                "Diff:",
                "\t--- Expected",
                "\t+++ Actual",
                "\t@@ -1 +1 @@",
                "\t-d: 321",
                "\t+c: 123",
            ]
        );
    }

    #[test]
    fn test_negated_pass_when_different() {
        let docs = vec![manifest(DOC)];
        assert!(run(&validator("a.b[0].c", "321"), &docs, true).passed);
    }

    #[test]
    fn test_negated_fail_when_equal() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.b[0]", "c: 123"), &docs, true);
        assert_eq!(
            validation.info,
            vec!["Path:\ta.b[0]", "Expected NOT to equal:", "\tc: 123"]
        );
    }

    #[test]
    fn test_missing_key_equals_null() {
        let docs = vec![manifest(DOC)];
        assert!(run(&validator("a.x", "~"), &docs, false).passed);
    }

    #[test]
    fn test_fail_on_traversal_error() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.b.e", "1"), &docs, false);
        assert_eq!(
            validation.info,
            vec![
                "Error:",
                "\tcan't get [\"e\"] from a non map type:",
                "\t- c: 123",
            ]
        );
    }
}
