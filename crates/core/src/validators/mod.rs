//! Assertion validators
//!
//! Every assertion type maps to one validator shape plus a flag telling
//! whether the name is the negated form of another (`notEqual` is `equal`
//! negated). The effective negation handed to a validator is the
//! assertion's `not` flag XOR that alias flag.
//!
//! Evaluation errors (document index out of range, bad path, bad regex,
//! wrong value type) always fail, regardless of negation.

use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use similar::TextDiff;

use crate::path::ValuePath;
use crate::snapshot::SnapshotComparer;
use crate::yaml::Document;

pub mod contains;
pub mod equal;
pub mod has_documents;
pub mod is_api_version;
pub mod is_empty;
pub mod is_kind;
pub mod is_null;
pub mod match_regex;
pub mod match_snapshot;

pub use contains::ContainsValidator;
pub use equal::EqualValidator;
pub use has_documents::HasDocumentsValidator;
pub use is_api_version::IsApiVersionValidator;
pub use is_empty::IsEmptyValidator;
pub use is_kind::IsKindValidator;
pub use is_null::IsNullValidator;
pub use match_regex::MatchRegexValidator;
pub use match_snapshot::MatchSnapshotValidator;

/// Context handed to validators
pub struct ValidateContext<'a> {
    /// Documents rendered from the target template
    pub docs: &'a [Document],
    /// Index of the document under test
    pub index: usize,
    /// Effective negation
    pub negative: bool,
    pub snapshot_comparer: Option<&'a mut dyn SnapshotComparer>,
}

impl<'a> ValidateContext<'a> {
    pub fn new(docs: &'a [Document]) -> Self {
        Self {
            docs,
            index: 0,
            negative: false,
            snapshot_comparer: None,
        }
    }

    /// The document at `index`
    pub fn manifest(&self) -> Result<&'a Document, Validation> {
        let docs: &'a [Document] = self.docs;
        docs.get(self.index).ok_or_else(|| {
            Validation::error(format!("documentIndex {} out of range", self.index))
        })
    }

    /// The value at `path` inside the document at `index`
    pub fn value_at(&self, path: &ValuePath) -> Result<&'a Value, Validation> {
        let manifest = self.manifest()?;
        path.fetch(manifest).map_err(Validation::error)
    }
}

/// Verdict of one validator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub passed: bool,
    /// Diagnostic lines, empty when passed
    pub info: Vec<String>,
}

impl Validation {
    pub fn pass() -> Self {
        Self {
            passed: true,
            info: Vec::new(),
        }
    }

    pub fn fail(info: Vec<String>) -> Self {
        Self {
            passed: false,
            info,
        }
    }

    /// An evaluation error, which never passes
    pub fn error(message: impl fmt::Display) -> Self {
        Self::fail(FailInfo::new().block("Error:", &message.to_string()).build())
    }
}

/// Implemented by every validator shape
pub trait Validate {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation;
}

/// Builder for multi-line, tab-indented diagnostics.
#[derive(Debug, Default)]
pub(crate) struct FailInfo {
    lines: Vec<String>,
}

impl FailInfo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `label<TAB>value`, continuation lines indented
    pub(crate) fn inline(mut self, label: &str, value: &str) -> Self {
        let text = format!("{}{}", label, indent(value));
        self.lines.extend(text.split('\n').map(str::to_string));
        self
    }

    /// `label` on its own line, followed by the indented value
    pub(crate) fn block(mut self, label: &str, value: &str) -> Self {
        self.lines.push(label.to_string());
        self.lines.extend(indent(value).split('\n').map(str::to_string));
        self
    }

    pub(crate) fn build(self) -> Vec<String> {
        self.lines
    }
}

fn indent(text: &str) -> String {
    let indented = text.replace('\n', "\n\t");
    format!(
        "\t{}",
        indented.trim_matches(|c| matches!(c, '\n' | '\t' | ' '))
    )
}

pub(crate) fn not_annotation(negative: bool, annotation: &'static str) -> &'static str {
    if negative {
        annotation
    } else {
        ""
    }
}

/// Unified line diff between expected and actual text
pub fn diff(expected: &str, actual: &str) -> String {
    TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(1)
        .header("Expected", "Actual")
        .to_string()
}

/// Every assertion type name a test suite may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertType {
    MatchSnapshot,
    Equal,
    NotEqual,
    MatchRegex,
    NotMatchRegex,
    Contains,
    NotContains,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsKind,
    #[serde(rename = "isAPIVersion")]
    IsApiVersion,
    HasDocuments,
}

impl AssertType {
    pub const ALL: [AssertType; 14] = [
        AssertType::MatchSnapshot,
        AssertType::Equal,
        AssertType::NotEqual,
        AssertType::MatchRegex,
        AssertType::NotMatchRegex,
        AssertType::Contains,
        AssertType::NotContains,
        AssertType::IsNull,
        AssertType::IsNotNull,
        AssertType::IsEmpty,
        AssertType::IsNotEmpty,
        AssertType::IsKind,
        AssertType::IsApiVersion,
        AssertType::HasDocuments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssertType::MatchSnapshot => "matchSnapshot",
            AssertType::Equal => "equal",
            AssertType::NotEqual => "notEqual",
            AssertType::MatchRegex => "matchRegex",
            AssertType::NotMatchRegex => "notMatchRegex",
            AssertType::Contains => "contains",
            AssertType::NotContains => "notContains",
            AssertType::IsNull => "isNull",
            AssertType::IsNotNull => "isNotNull",
            AssertType::IsEmpty => "isEmpty",
            AssertType::IsNotEmpty => "isNotEmpty",
            AssertType::IsKind => "isKind",
            AssertType::IsApiVersion => "isAPIVersion",
            AssertType::HasDocuments => "hasDocuments",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether this name is the negated alias of another type
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            AssertType::NotEqual
                | AssertType::NotMatchRegex
                | AssertType::NotContains
                | AssertType::IsNotNull
                | AssertType::IsNotEmpty
        )
    }

    /// Decode the raw parameters of this type into its validator
    pub fn decode(self, params: Value) -> Result<Validator, serde_yaml::Error> {
        let params = match params {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        };

        Ok(match self {
            AssertType::MatchSnapshot => Validator::MatchSnapshot(serde_yaml::from_value(params)?),
            AssertType::Equal | AssertType::NotEqual => {
                Validator::Equal(serde_yaml::from_value(params)?)
            }
            AssertType::MatchRegex | AssertType::NotMatchRegex => {
                Validator::MatchRegex(serde_yaml::from_value(params)?)
            }
            AssertType::Contains | AssertType::NotContains => {
                Validator::Contains(serde_yaml::from_value(params)?)
            }
            AssertType::IsNull | AssertType::IsNotNull => {
                Validator::IsNull(serde_yaml::from_value(params)?)
            }
            AssertType::IsEmpty | AssertType::IsNotEmpty => {
                Validator::IsEmpty(serde_yaml::from_value(params)?)
            }
            AssertType::IsKind => Validator::IsKind(serde_yaml::from_value(params)?),
            AssertType::IsApiVersion => Validator::IsApiVersion(serde_yaml::from_value(params)?),
            AssertType::HasDocuments => Validator::HasDocuments(serde_yaml::from_value(params)?),
        })
    }
}

impl fmt::Display for AssertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded validator, one variant per shape
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    MatchSnapshot(MatchSnapshotValidator),
    Equal(EqualValidator),
    MatchRegex(MatchRegexValidator),
    Contains(ContainsValidator),
    IsNull(IsNullValidator),
    IsEmpty(IsEmptyValidator),
    IsKind(IsKindValidator),
    IsApiVersion(IsApiVersionValidator),
    HasDocuments(HasDocumentsValidator),
}

impl Validate for Validator {
    fn validate(&self, context: &mut ValidateContext<'_>) -> Validation {
        match self {
            Validator::MatchSnapshot(v) => v.validate(context),
            Validator::Equal(v) => v.validate(context),
            Validator::MatchRegex(v) => v.validate(context),
            Validator::Contains(v) => v.validate(context),
            Validator::IsNull(v) => v.validate(context),
            Validator::IsEmpty(v) => v.validate(context),
            Validator::IsKind(v) => v.validate(context),
            Validator::IsApiVersion(v) => v.validate(context),
            Validator::HasDocuments(v) => v.validate(context),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) fn manifest(text: &str) -> Document {
        serde_yaml::from_str(text).unwrap()
    }

    pub(crate) fn run(validator: &impl Validate, docs: &[Document], negative: bool) -> Validation {
        let mut context = ValidateContext::new(docs);
        context.negative = negative;
        validator.validate(&mut context)
    }
}
