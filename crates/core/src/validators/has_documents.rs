use serde::Deserialize;

use super::{FailInfo, Validate, ValidateContext, Validation};

/// Passes when the target rendered exactly `count` documents.
/// Ignores the document index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HasDocumentsValidator {
    pub count: usize,
}

impl Validate for HasDocumentsValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = context.docs.len();
        if (actual == self.count) != context.negative {
            return Validation::pass();
        }

        let expected = self.count.to_string();
        let info = if context.negative {
            FailInfo::new().inline("Expected documents count NOT to be:", &expected)
        } else {
            FailInfo::new()
                .inline("Expected documents count:", &expected)
                .inline("Actual:", &actual.to_string())
        };
        Validation::fail(info.build())
    }
}
