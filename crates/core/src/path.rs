//! Dotted/bracketed value paths
//!
//! A path such as `spec.containers[0].image` addresses a value inside a
//! nested document. The same syntax is used for `set` overrides, so the
//! characters `,`, `{`, `}` and `=` are reserved and must be escaped with a
//! backslash, as must `.`, `[` and `]` inside a key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::yaml::to_yaml;

static NULL: Value = Value::Null;

/// Largest array index a path may address. `build` allocates every slot up
/// to the index.
pub const MAX_INDEX: usize = 65_536;

/// A single traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    MapKey(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::MapKey(key) => write!(f, "[\"{}\"]", key),
            Step::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Path syntax errors, detected when a path is parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("`{path}`: reserved character '{found}' must be escaped")]
    Reserved { path: String, found: char },

    #[error("`{path}`: invalid array index \"{index}\"")]
    InvalidIndex { path: String, index: String },

    #[error("`{path}`: unexpected '{found}'")]
    Unexpected { path: String, found: char },

    #[error("`{path}`: unexpected end of path")]
    UnexpectedEnd { path: String },
}

/// Fetch failures. Each carries the failing step and a YAML rendering of the
/// value it could not be applied to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraversalError {
    #[error("can't get [\"{key}\"] from a non map type:\n{rendered}")]
    NotAMap { key: String, rendered: String },

    #[error("can't get [{index}] from a non array type:\n{rendered}")]
    NotAnArray { index: usize, rendered: String },

    #[error("[{index}] :\n{rendered}")]
    OutOfRange { index: usize, rendered: String },
}

/// A parsed path, keeping the text it was parsed from for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValuePath {
    source: String,
    steps: Vec<Step>,
}

impl ValuePath {
    /// Parse a path. The empty string addresses the whole document.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        Ok(Self {
            source: text.to_string(),
            steps: parse_steps(text)?,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Read the value at this path. A missing map key yields null.
    pub fn fetch<'a>(&self, document: &'a Value) -> Result<&'a Value, TraversalError> {
        let mut current = document;
        for step in &self.steps {
            current = match (step, current) {
                (Step::MapKey(key), Value::Mapping(map)) => {
                    map.get(key.as_str()).unwrap_or(&NULL)
                }
                (Step::MapKey(key), other) => {
                    return Err(TraversalError::NotAMap {
                        key: key.clone(),
                        rendered: to_yaml(other),
                    })
                }
                (Step::Index(idx), Value::Sequence(items)) => match items.get(*idx) {
                    Some(item) => item,
                    None => {
                        return Err(TraversalError::OutOfRange {
                            index: *idx,
                            rendered: to_yaml(current),
                        })
                    }
                },
                (Step::Index(idx), other) => {
                    return Err(TraversalError::NotAnArray {
                        index: *idx,
                        rendered: to_yaml(other),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Build the minimal nested structure whose leaf at this path is `leaf`.
    pub fn build(&self, leaf: Value) -> Value {
        let mut built = leaf;
        for step in self.steps.iter().rev() {
            built = match step {
                Step::MapKey(key) => {
                    let mut map = Mapping::new();
                    map.insert(Value::String(key.clone()), built);
                    Value::Mapping(map)
                }
                Step::Index(idx) => {
                    let mut items = vec![Value::Null; idx.saturating_add(1)];
                    if let Some(slot) = items.last_mut() {
                        *slot = built;
                    }
                    Value::Sequence(items)
                }
            };
        }
        built
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for ValuePath {
    type Error = PathError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let steps = parse_steps(&text)?;
        Ok(Self { source: text, steps })
    }
}

impl From<ValuePath> for String {
    fn from(path: ValuePath) -> Self {
        path.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectKey,
    ExpectIndex,
    ExpectDenotation,
}

const RESERVED: [char; 4] = [',', '{', '}', '='];

fn is_stop(c: char) -> bool {
    matches!(c, '.' | '[' | ']') || RESERVED.contains(&c)
}

fn parse_steps(text: &str) -> Result<Vec<Step>, PathError> {
    let mut steps = Vec::new();
    if text.is_empty() {
        return Ok(steps);
    }

    let mut chars = text.chars();
    let mut state = State::ExpectKey;

    loop {
        // accumulate one token up to the next unescaped delimiter
        let mut token = String::new();
        let mut delimiter = None;
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(escaped) => token.push(escaped),
                    None => break,
                }
            } else if is_stop(c) {
                delimiter = Some(c);
                break;
            } else {
                token.push(c);
            }
        }

        let Some(delimiter) = delimiter else {
            return match state {
                State::ExpectKey if !token.is_empty() => {
                    steps.push(Step::MapKey(token));
                    Ok(steps)
                }
                State::ExpectDenotation if token.is_empty() => Ok(steps),
                _ => Err(PathError::UnexpectedEnd {
                    path: text.to_string(),
                }),
            };
        };

        if RESERVED.contains(&delimiter) {
            return Err(PathError::Reserved {
                path: text.to_string(),
                found: delimiter,
            });
        }

        state = match (state, delimiter) {
            (State::ExpectKey, '.') => {
                steps.push(Step::MapKey(token));
                State::ExpectKey
            }
            (State::ExpectKey, '[') => {
                steps.push(Step::MapKey(token));
                State::ExpectIndex
            }
            (State::ExpectIndex, ']') => {
                let idx = token
                    .parse::<usize>()
                    .ok()
                    .filter(|idx| *idx <= MAX_INDEX)
                    .ok_or_else(|| PathError::InvalidIndex {
                        path: text.to_string(),
                        index: token.clone(),
                    })?;
                steps.push(Step::Index(idx));
                State::ExpectDenotation
            }
            (State::ExpectDenotation, '.') if token.is_empty() => State::ExpectKey,
            (State::ExpectDenotation, '[') if token.is_empty() => State::ExpectIndex,
            (State::ExpectDenotation, _) if !token.is_empty() => {
                return Err(PathError::Unexpected {
                    path: text.to_string(),
                    found: token.chars().next().unwrap_or(delimiter),
                })
            }
            (_, found) => {
                return Err(PathError::Unexpected {
                    path: text.to_string(),
                    found,
                })
            }
        };
    }
}
