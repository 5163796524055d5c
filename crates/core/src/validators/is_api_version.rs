use serde::Deserialize;
use serde_yaml::Value;

use super::{FailInfo, Validate, ValidateContext, Validation};
use crate::yaml::to_yaml;

/// Passes when the document's `apiVersion` equals `of`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsApiVersionValidator {
    pub of: String,
}

impl Validate for IsApiVersionValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let manifest = match context.manifest() {
            Ok(manifest) => manifest,
            Err(failure) => return failure,
        };

        let api_version = manifest.get("apiVersion");
        let matched = api_version.and_then(Value::as_str) == Some(self.of.as_str());
        if matched != context.negative {
            return Validation::pass();
        }

        let info = if context.negative {
            FailInfo::new().inline("Expected NOT to be apiVersion:", &self.of)
        } else {
            let actual = match api_version {
                Some(Value::String(s)) => s.clone(),
                Some(other) => to_yaml(other),
                None => "null".to_string(),
            };
            FailInfo::new()
                .inline("Expected apiVersion:", &self.of)
                .inline("Actual:", &actual)
        };
        Validation::fail(info.build())
    }
}
