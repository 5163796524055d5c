use serde::Deserialize;
use serde_yaml::Value;

use super::{not_annotation, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Passes when the array at `path` holds an element deeply equal to
/// `content`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainsValidator {
    #[serde(default)]
    pub path: ValuePath,
    #[serde(default)]
    pub content: Value,
}

impl Validate for ContainsValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        let Value::Sequence(items) = actual else {
            return Validation::error(format!(
                "expect '{}' to be an array, got:\n{}",
                self.path,
                to_yaml(actual)
            ));
        };

        if items.contains(&self.content) != context.negative {
            return Validation::pass();
        }

        let expected = Value::Sequence(vec![self.content.clone()]);
        Validation::fail(
            FailInfo::new()
                .inline("Path:", self.path.as_str())
                .block(
                    &format!("Expected{} to contain:", not_annotation(context.negative, " NOT")),
                    &to_yaml(&expected),
                )
                .block("Actual:", &to_yaml(actual))
                .build(),
        )
    }
}
