//! A single declared assertion
//!
//! An assertion entry is a mapping holding the optional `template`,
//! `documentIndex` and `not` keys plus exactly one assertion type key whose
//! value carries that type's parameters:
//!
//! ```yaml
//! - template: deployment.yaml
//!   documentIndex: 0
//!   not: true
//!   equal:
//!     path: spec.replicas
//!     value: 3
//! ```

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::results::AssertionResult;
use crate::snapshot::SnapshotComparer;
use crate::validators::{AssertType, Validate, ValidateContext, Validation, Validator};
use crate::yaml::{to_yaml, Document};

#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    /// Target template, relative to the chart's `templates` directory
    pub template: Option<String>,
    pub document_index: usize,
    pub not: bool,
    pub assert_type: AssertType,
    pub validator: Validator,
}

fn definition_error(message: String) -> Error {
    Error::AssertionDefinition(message)
}

impl Assertion {
    /// Decode an assertion from its raw mapping.
    pub fn from_mapping(map: Mapping) -> Result<Self> {
        let mut template = None;
        let mut document_index = 0;
        let mut not = false;
        let mut found: Option<(AssertType, Value)> = None;

        for (key, value) in map {
            let Some(name) = key.as_str() else {
                return Err(definition_error(format!(
                    "Assertion type `{}` is invalid",
                    to_yaml(&key).trim_end()
                )));
            };

            match name {
                "template" => {
                    template = match value {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        _ => return Err(definition_error("`template` must be a string".into())),
                    }
                }
                "documentIndex" => {
                    document_index = value
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .ok_or_else(|| {
                            definition_error(
                                "`documentIndex` must be a non-negative integer".into(),
                            )
                        })?;
                }
                "not" => {
                    not = value
                        .as_bool()
                        .ok_or_else(|| definition_error("`not` must be a boolean".into()))?;
                }
                other => {
                    let assert_type = AssertType::from_name(other).ok_or_else(|| {
                        definition_error(format!("Assertion type `{}` is invalid", other))
                    })?;
                    if let Some((declared, _)) = &found {
                        return Err(definition_error(format!(
                            "Assertion type `{}` and `{}` is declared duplicately",
                            declared, assert_type
                        )));
                    }
                    found = Some((assert_type, value));
                }
            }
        }

        let (assert_type, params) =
            found.ok_or_else(|| definition_error("No assertion type defined".into()))?;
        let validator = assert_type.decode(params).map_err(|e| {
            definition_error(format!("invalid parameters for `{}`: {}", assert_type, e))
        })?;

        Ok(Self {
            template,
            document_index,
            not,
            assert_type,
            validator,
        })
    }

    /// Negation handed to the validator
    pub fn effective_negation(&self) -> bool {
        self.not != self.assert_type.is_negated()
    }

    /// Run the assertion against the rendered documents of `target`.
    ///
    /// `target` is the fully qualified output name, or `None` when neither
    /// the assertion nor its suite names a template.
    pub fn assert(
        &self,
        index: usize,
        target: Option<&str>,
        rendered: &BTreeMap<String, Vec<Document>>,
        snapshot_comparer: &mut dyn SnapshotComparer,
    ) -> AssertionResult {
        let validation = match target.map(|name| (name, rendered.get(name))) {
            Some((_, Some(docs))) => {
                let mut context = ValidateContext {
                    docs,
                    index: self.document_index,
                    negative: self.effective_negation(),
                    snapshot_comparer: Some(snapshot_comparer),
                };
                self.validator.validate(&mut context)
            }
            Some((name, None)) => Validation::error(format!(
                "template \"{}\" not exists or not selected in test suite",
                name
            )),
            None => Validation::error(
                "assertion.template must be given if testsuite.templates is empty",
            ),
        };

        AssertionResult {
            index,
            assert_type: self.assert_type,
            not: self.not,
            passed: validation.passed,
            fail_info: validation.info,
        }
    }
}

impl<'de> Deserialize<'de> for Assertion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Mapping::deserialize(deserializer)?;
        Assertion::from_mapping(map).map_err(D::Error::custom)
    }
}
