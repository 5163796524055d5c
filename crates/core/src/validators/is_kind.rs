use serde::Deserialize;

use super::{FailInfo, Validate, ValidateContext, Validation};
use crate::yaml::to_yaml;

/// Passes when the document's `kind` equals `of`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsKindValidator {
    pub of: String,
}

impl Validate for IsKindValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let manifest = match context.manifest() {
            Ok(manifest) => manifest,
            Err(failure) => return failure,
        };

        let kind = manifest.get("kind");
        let matched = kind.and_then(|k| k.as_str()) == Some(self.of.as_str());
        if matched != context.negative {
            return Validation::pass();
        }

        let info = if context.negative {
            FailInfo::new().inline("Expected NOT to be kind:", &self.of)
        } else {
            let actual = match kind {
                Some(serde_yaml::Value::String(s)) => s.clone(),
                Some(other) => to_yaml(other),
                None => "null".to_string(),
            };
            FailInfo::new()
                .inline("Expected kind:", &self.of)
                .inline("Actual:", &actual)
        };
        Validation::fail(info.build())
    }
}
