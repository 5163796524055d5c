//! Canonical YAML rendering and multi-document decoding
//!
//! Snapshot files and diagnostics are diffed by humans and tooling, so the
//! text produced here must be byte-stable: mapping keys are sorted before
//! serialization and multi-line strings come out as literal blocks.

use std::cmp::Ordering;

use serde::de::Error as _;
use serde::Deserialize;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};

use crate::error::Result;

/// One decoded unit of rendered output. Always a non-empty mapping.
pub type Document = Value;

/// Render a value as canonical YAML text.
pub fn to_yaml(value: &Value) -> String {
    match serde_yaml::to_string(&canonicalize(value)) {
        Ok(text) => text,
        Err(e) => format!("<unserializable value: {}>\n", e),
    }
}

/// Recursively sort mapping keys so that serialization is deterministic.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(&Value, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

            let mut sorted = Mapping::with_capacity(entries.len());
            for (key, item) in entries {
                sorted.insert(key.clone(), canonicalize(item));
            }
            Value::Mapping(sorted)
        }
        Value::Sequence(items) => Value::Sequence(items.iter().map(canonicalize).collect()),
        Value::Tagged(tagged) => Value::Tagged(Box::new(TaggedValue {
            tag: tagged.tag.clone(),
            value: canonicalize(&tagged.value),
        })),
        other => other.clone(),
    }
}

// numbers first (numerically), then strings, then everything else by text
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::String(_), _) => Ordering::Less,
        (_, Value::String(_)) => Ordering::Greater,
        _ => to_yaml(a).cmp(&to_yaml(b)),
    }
}

/// Decode a (possibly multi-document) YAML text into documents.
///
/// Null and empty documents are dropped; a document that is not a
/// mapping is rejected.
pub fn parse_documents(text: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for deserializer in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => continue,
            Value::Mapping(ref map) if map.is_empty() => continue,
            Value::Mapping(_) => documents.push(value),
            other => {
                return Err(serde_yaml::Error::custom(format!(
                    "expected a mapping document, got:\n{}",
                    to_yaml(&other)
                ))
                .into());
            }
        }
    }

    Ok(documents)
}
