//! User value assembly
//!
//! Override values from value files and `set` paths are merged in order and
//! scoped under the chart route, so a sub-chart's test overrides land under
//! the sub-chart's key in the parent chart's values.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::path::ValuePath;
use crate::yaml::to_yaml;

/// Message for a `set` entry whose key is the empty path
pub const EMPTY_SET_PATH: &str = "set path is empty";

/// Deeply merge `src` into `dest`. Values in `src` win unless both sides
/// hold a mapping for the same key, in which case they are merged.
pub fn merge_values(mut dest: Mapping, src: Mapping) -> Mapping {
    for (key, value) in src {
        let merged = match (dest.get(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                Value::Mapping(merge_values(existing.clone(), incoming))
            }
            (_, incoming) => incoming,
        };
        dest.insert(key, merged);
    }
    dest
}

/// Split a chart route like `parent/charts/child` into chart names.
pub fn split_chart_routes(route: &str) -> Vec<String> {
    route
        .split('/')
        .step_by(2)
        .map(str::to_string)
        .collect()
}

/// Nest `values` under every chart name after the root chart.
pub fn scope_values_with_routes(routes: &[String], values: Mapping) -> Mapping {
    routes.iter().skip(1).rev().fold(values, |inner, name| {
        let mut outer = Mapping::new();
        outer.insert(Value::String(name.clone()), Value::Mapping(inner));
        outer
    })
}

/// Assemble the override values of a test job.
///
/// Value files are resolved relative to `base_dir` unless absolute and merged
/// in order; `set` entries are applied afterwards in declaration order.
pub fn assemble_user_values(
    value_files: &[String],
    set: &[(ValuePath, Value)],
    routes: &[String],
    base_dir: &Path,
) -> Result<Mapping> {
    let mut base = Mapping::new();

    for specified in value_files {
        let file_path = if Path::new(specified).is_absolute() {
            Path::new(specified).to_path_buf()
        } else {
            base_dir.join(specified)
        };

        let content = std::fs::read_to_string(&file_path).map_err(|e| Error::ValuesFile {
            path: specified.clone(),
            reason: e.to_string(),
        })?;
        let parsed: Value = serde_yaml::from_str(&content).map_err(|e| Error::ValuesFile {
            path: specified.clone(),
            reason: e.to_string(),
        })?;
        let values = match parsed {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(Error::ValuesFile {
                    path: specified.clone(),
                    reason: "top level is not a mapping".to_string(),
                })
            }
        };

        base = merge_values(base, scope_values_with_routes(routes, values));
    }

    for (path, value) in set {
        if path.is_empty() {
            return Err(Error::AssertionDefinition(EMPTY_SET_PATH.to_string()));
        }
        let built = match path.build(value.clone()) {
            Value::Mapping(map) => map,
            other => {
                return Err(Error::AssertionDefinition(format!(
                    "set path `{}` must start with a key, got:\n{}",
                    path,
                    to_yaml(&other).trim_end()
                )))
            }
        };
        base = merge_values(base, scope_values_with_routes(routes, built));
    }

    Ok(base)
}
