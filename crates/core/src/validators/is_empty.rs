use serde::Deserialize;
use serde_yaml::Value;

use super::{not_annotation, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Passes when the value at `path` is the zero value of its kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsEmptyValidator {
    #[serde(default)]
    pub path: ValuePath,
}

/// Null, an empty collection, an empty string, zero and `false` are empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_empty_value(&tagged.value),
    }
}

impl Validate for IsEmptyValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        if is_empty_value(actual) != context.negative {
            return Validation::pass();
        }

        Validation::fail(
            FailInfo::new()
                .inline("Path:", self.path.as_str())
                .block(
                    &format!("Expected{} to be empty, got:", not_annotation(context.negative, " NOT")),
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
    use test_case::test_case;

    const DOC: &str = "
a:
  s: ''
  l: []
  m: {}
  z: 0
  f: false
  n: ~
  full:
    - item
";

    fn validator(path: &str) -> IsEmptyValidator {
        IsEmptyValidator {
            path: ValuePath::parse(path).unwrap(),
        }
    }

    #[test_case("a.s" ; "empty string")]
    #[test_case("a.l" ; "empty list")]
    #[test_case("a.m" ; "empty map")]
    #[test_case("a.z" ; "zero")]
    #[test_case("a.f" ; "false")]
    #[test_case("a.n" ; "null")]
    #[test_case("a.missing" ; "missing")]
    fn test_pass_when_empty(path: &str) {
        let docs = vec![manifest(DOC)];
        assert!(run(&validator(path), &docs, false).passed);
        assert!(!run(&validator(path), &docs, true).passed);
    }

    #[test]
    fn test_fail_when_not_empty() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.full"), &docs, false);
        assert_eq!(
            validation.info,
            vec!["Path:\ta.full", "Expected to be empty, got:", "\t- item"]
        );
    }

    #[test]
    fn test_negated_fail_when_empty() {
        let docs = vec![manifest(DOC)];
        let validation = run(&validator("a.l"), &docs, true);
        assert_eq!(
            validation.info,
            vec!["Path:\ta.l", "Expected NOT to be empty, got:", "\t[]"]
        );
    }
}
