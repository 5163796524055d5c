use serde::Deserialize;

use super::{not_annotation, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Passes when the value at `path` is null or missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsNullValidator {
    #[serde(default)]
    pub path: ValuePath,
}

impl Validate for IsNullValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        if actual.is_null() != context.negative {
            return Validation::pass();
        }

        Validation::fail(
            FailInfo::new()
                .inline("Path:", self.path.as_str())
                .block(
                    &format!("Expected{} to be null, got:", not_annotation(context.negative, " NOT")),
                    &to_yaml(actual),
                )
                .build(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{manifest, run};
    use super::*;

    const DOC: &str = "
a:
  b: ~
  c: value
";

    fn validator(path: &str) -> IsNullValidator {
        IsNullValidator {
            path: ValuePath::parse(path).unwrap(),
        }
    }

    #[test]
    fn test_pass_when_null_or_missing() {
        let docs = vec![manifest(DOC)];
        assert!(run(&validator("a.b"), &docs, false).passed);
        assert!(run(&validator("a.missing"), &docs, false).passed);
    }

    #[test]
    fn test_fail_when_not_null() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.c"), &docs, false);
        assert_eq!(
            validation.info,
            vec!["Path:\ta.c", "Expected to be null, got:", "\tvalue"]
        );
    }

    #[test]
    fn test_negated_fail_when_null() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.b"), &docs, true);
        assert_eq!(
            validation.info,
            vec!["Path:\ta.b", "Expected NOT to be null, got:", "\tnull"]
        );
        assert!(run(&validator("a.c"), &docs, true).passed);
    }
}
