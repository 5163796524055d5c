use serde::Deserialize;

use super::{diff, not_annotation, FailInfo, Validate, ValidateContext, Validation};
use crate::path::ValuePath;

/// Passes when the value at `path` matches the recorded snapshot for the
/// same test and ordinal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchSnapshotValidator {
    #[serde(default)]
    pub path: ValuePath,
}

impl Validate for MatchSnapshotValidator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        let actual = match context.value_at(&self.path) {
            Ok(actual) => actual,
            Err(failure) => return failure,
        };

        let Some(comparer) = context.snapshot_comparer.as_deref_mut() else {
            return Validation::error("no snapshot store available");
        };
        let result = comparer.compare_to_snapshot(actual);

        if result.passed != context.negative {
            return Validation::pass();
        }

        let label = format!(
            "Expected{} to match snapshot {}:",
            not_annotation(context.negative, " NOT"),
            result.index
        );
        let detail = if context.negative {
            result.cached_snapshot.clone()
        } else {
            diff(&result.cached_snapshot, &result.new_snapshot)
        };

        Validation::fail(
            FailInfo::new()
                .inline("Path:", self.path.as_str())
                .block(&label, &detail)
                .build(),
        )
    }
}
