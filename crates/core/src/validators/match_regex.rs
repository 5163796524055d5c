use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;

use super::{not_annotation, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Passes when the string at `path` matches `pattern` anywhere.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchRegexValidator {
    #[serde(default)]
    pub path: ValuePath,
    pub pattern: String,
}

impl Validate for MatchRegexValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        let pattern = match Regex::new(&self.pattern) {
            Ok(pattern) => pattern,
            Err(e) => return Validation::error(e),
        };

        let Value::String(text) = actual else {
            return Validation::error(format!(
                "expect '{}' to be a string, got:\n{}",
                self.path,
                to_yaml(actual)
            ));
        };

        if pattern.is_match(text) != context.negative {
            return Validation::pass();
        }

        Validation::fail(
            FailInfo::new()
                .inline("Path:", self.path.as_str())
                .inline(
                    &format!("Expected{} to match:", not_annotation(context.negative, " NOT")),
                    &self.pattern,
                )
                .inline("Actual:", text)
                .build(),
        )
    }
}
