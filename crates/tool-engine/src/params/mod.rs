//! Parameter type system
//!
//! A [`Parameter`] couples the flags shared by every tool parameter
//! (optional, advanced, ignored, description) with a [`ParameterKind`]
//! holding the typed value and its domain.
//!
//! Every kind supports the same string contract:
//!
//! - [`Parameter::fill_from_string`] parses and validates a serialized value
//! - [`Parameter::string_rep`] serializes it back losslessly
//!
//! The empty string always stands for "unset" on scalar kinds and for the
//! empty list on list kinds.

mod choice;
mod list;
mod number;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolEngineError};

pub use choice::Choice;
pub use list::{join_list, split_list, LIST_SEPARATOR};
pub use number::{Bounds, NumberLiteral};

pub(crate) use choice::is_boolean_domain;

/// Typed value and domain of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    Int {
        value: Option<i64>,
        bounds: Bounds<i64>,
    },
    Double {
        value: Option<f64>,
        bounds: Bounds<f64>,
    },
    String {
        value: Option<String>,
    },
    Bool {
        value: Option<bool>,
    },
    Choice {
        choice: Choice,
    },
    IntList {
        values: Vec<i64>,
        bounds: Bounds<i64>,
    },
    DoubleList {
        values: Vec<f64>,
        bounds: Bounds<f64>,
    },
    StringList {
        values: Vec<String>,
        restrictions: Option<Vec<String>>,
    },
    /// Single file bound to the port named `port`
    File {
        port: String,
        path: Option<PathBuf>,
    },
    /// File list bound to the port named `port`
    FileList {
        port: String,
        paths: Vec<PathBuf>,
    },
}

/// A single tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    key: String,
    kind: ParameterKind,
    /// May be left unset
    pub optional: bool,
    /// Hidden behind "advanced" toggles in hosts
    pub advanced: bool,
    /// Excluded from the generated command line
    pub ignored: bool,
    pub description: String,
    pub mnemonic: Option<String>,
}

impl Parameter {
    /// Create a mandatory, non-advanced parameter
    pub fn new(key: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            key: key.into(),
            kind,
            optional: false,
            advanced: false,
            ignored: false,
            description: String::new(),
            mnemonic: None,
        }
    }

    pub fn int(key: impl Into<String>, bounds: Bounds<i64>) -> Self {
        Self::new(key, ParameterKind::Int { value: None, bounds })
    }

    pub fn double(key: impl Into<String>, bounds: Bounds<f64>) -> Self {
        Self::new(key, ParameterKind::Double { value: None, bounds })
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, ParameterKind::String { value: None })
    }

    pub fn boolean(key: impl Into<String>) -> Self {
        Self::new(key, ParameterKind::Bool { value: None })
    }

    pub fn choice(key: impl Into<String>, choice: Choice) -> Self {
        Self::new(key, ParameterKind::Choice { choice })
    }

    pub fn int_list(key: impl Into<String>, bounds: Bounds<i64>) -> Self {
        Self::new(
            key,
            ParameterKind::IntList {
                values: Vec::new(),
                bounds,
            },
        )
    }

    pub fn double_list(key: impl Into<String>, bounds: Bounds<f64>) -> Self {
        Self::new(
            key,
            ParameterKind::DoubleList {
                values: Vec::new(),
                bounds,
            },
        )
    }

    pub fn string_list(key: impl Into<String>, restrictions: Option<Vec<String>>) -> Self {
        Self::new(
            key,
            ParameterKind::StringList {
                values: Vec::new(),
                restrictions,
            },
        )
    }

    /// File parameter bound to the port of the same name
    pub fn file(key: impl Into<String>) -> Self {
        let key = key.into();
        let port = key.clone();
        Self::new(key, ParameterKind::File { port, path: None })
    }

    /// File list parameter bound to the port of the same name
    pub fn file_list(key: impl Into<String>) -> Self {
        let key = key.into();
        let port = key.clone();
        Self::new(
            key,
            ParameterKind::FileList {
                port,
                paths: Vec::new(),
            },
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ParameterKind {
        &mut self.kind
    }

    /// Short type name, as used by descriptors and hosts
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ParameterKind::Int { .. } => "int",
            ParameterKind::Double { .. } => "double",
            ParameterKind::String { .. } => "string",
            ParameterKind::Bool { .. } => "bool",
            ParameterKind::Choice { .. } => "choice",
            ParameterKind::IntList { .. } => "int-list",
            ParameterKind::DoubleList { .. } => "double-list",
            ParameterKind::StringList { .. } => "string-list",
            ParameterKind::File { .. } => "file",
            ParameterKind::FileList { .. } => "file-list",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::IntList { .. }
                | ParameterKind::DoubleList { .. }
                | ParameterKind::StringList { .. }
                | ParameterKind::FileList { .. }
        )
    }

    /// Name of the port this parameter is bound to, for file kinds
    pub fn port_name(&self) -> Option<&str> {
        match &self.kind {
            ParameterKind::File { port, .. } | ParameterKind::FileList { port, .. } => Some(port),
            _ => None,
        }
    }

    /// Whether a value (or at least one list element) is present
    pub fn is_set(&self) -> bool {
        match &self.kind {
            ParameterKind::Int { value, .. } => value.is_some(),
            ParameterKind::Double { value, .. } => value.is_some(),
            ParameterKind::String { value } => value.is_some(),
            ParameterKind::Bool { value } => value.is_some(),
            ParameterKind::Choice { choice } => choice.value.is_some(),
            ParameterKind::IntList { values, .. } => !values.is_empty(),
            ParameterKind::DoubleList { values, .. } => !values.is_empty(),
            ParameterKind::StringList { values, .. } => !values.is_empty(),
            ParameterKind::File { path, .. } => path.is_some(),
            ParameterKind::FileList { paths, .. } => !paths.is_empty(),
        }
    }

    /// Parse `s` into the value, leaving it untouched on failure
    pub fn fill_from_string(&mut self, s: &str) -> Result<()> {
        let key = self.key.clone();
        let invalid = |reason: String| ToolEngineError::invalid_value(key.clone(), reason);

        match &mut self.kind {
            ParameterKind::Int { value, bounds } => {
                *value = parse_scalar(s, bounds).map_err(invalid)?;
            }
            ParameterKind::Double { value, bounds } => {
                *value = parse_scalar(s, bounds).map_err(invalid)?;
            }
            ParameterKind::String { value } => {
                *value = (!s.is_empty()).then(|| s.to_string());
            }
            ParameterKind::Bool { value } => {
                *value = match s {
                    "" => None,
                    "true" => Some(true),
                    "false" => Some(false),
                    other => return Err(invalid(format!("'{}' is not a boolean", other))),
                };
            }
            ParameterKind::Choice { choice } => {
                if s.is_empty() {
                    choice.value = None;
                } else if choice.contains(s) {
                    choice.value = Some(s.to_string());
                } else {
                    return Err(invalid(format!("'{}' is not one of the allowed values", s)));
                }
            }
            ParameterKind::File { path, .. } => {
                *path = (!s.is_empty()).then(|| PathBuf::from(s));
            }
            _ => {
                let parts: Vec<String> = split_list(s).into_iter().map(String::from).collect();
                return self.fill_from_strings(&parts);
            }
        }
        Ok(())
    }

    /// Replace the entire content of a list parameter
    ///
    /// Scalars accept a single element (or none, which unsets them).
    pub fn fill_from_strings(&mut self, items: &[String]) -> Result<()> {
        let key = self.key.clone();
        let invalid = |reason: String| ToolEngineError::invalid_value(key.clone(), reason);

        for item in items {
            list::check_element(item).map_err(invalid)?;
        }

        match &mut self.kind {
            ParameterKind::IntList { values, bounds } => {
                *values = parse_elements(items, bounds).map_err(invalid)?;
            }
            ParameterKind::DoubleList { values, bounds } => {
                *values = parse_elements(items, bounds).map_err(invalid)?;
            }
            ParameterKind::StringList {
                values,
                restrictions,
            } => {
                if let Some(allowed) = restrictions {
                    if let Some(bad) = items.iter().find(|i| !allowed.contains(i)) {
                        return Err(invalid(format!("'{}' is not one of the allowed values", bad)));
                    }
                }
                *values = items.to_vec();
            }
            ParameterKind::FileList { paths, .. } => {
                *paths = items.iter().map(PathBuf::from).collect();
            }
            _ => match items {
                [] => self.fill_from_string("")?,
                [single] => self.fill_from_string(single)?,
                _ => {
                    return Err(invalid(format!(
                        "{} values given for a single-valued parameter",
                        items.len()
                    )))
                }
            },
        }
        Ok(())
    }

    /// Lossless serialized form of the current value
    pub fn string_rep(&self) -> String {
        match &self.kind {
            ParameterKind::File { path, .. } => path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ if self.is_list() => join_list(self.values()),
            _ => self.values().into_iter().next().unwrap_or_default(),
        }
    }

    /// Current value as individual command-line tokens
    pub fn values(&self) -> Vec<String> {
        match &self.kind {
            ParameterKind::Int { value, .. } => value.iter().map(|v| v.format_literal()).collect(),
            ParameterKind::Double { value, .. } => {
                value.iter().map(|v| v.format_literal()).collect()
            }
            ParameterKind::String { value } => value.iter().cloned().collect(),
            ParameterKind::Bool { value } => value.iter().map(|v| v.to_string()).collect(),
            ParameterKind::Choice { choice } => choice.value.iter().cloned().collect(),
            ParameterKind::IntList { values, .. } => {
                values.iter().map(|v| v.format_literal()).collect()
            }
            ParameterKind::DoubleList { values, .. } => {
                values.iter().map(|v| v.format_literal()).collect()
            }
            ParameterKind::StringList { values, .. } => values.clone(),
            ParameterKind::File { path, .. } => path
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            ParameterKind::FileList { paths, .. } => paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }

    /// Whether the current value satisfies the domain; unset is always valid
    pub fn validate(&self) -> bool {
        match &self.kind {
            ParameterKind::Int { value, bounds } => bounds.validate(*value),
            ParameterKind::Double { value, bounds } => bounds.validate(*value),
            ParameterKind::Choice { choice } => {
                choice.value.as_deref().map_or(true, |v| choice.contains(v))
            }
            ParameterKind::IntList { values, bounds } => {
                values.iter().all(|v| bounds.validate(Some(*v)))
            }
            ParameterKind::DoubleList { values, bounds } => {
                values.iter().all(|v| bounds.validate(Some(*v)))
            }
            ParameterKind::StringList {
                values,
                restrictions: Some(allowed),
            } => values.iter().all(|v| allowed.contains(v)),
            _ => true,
        }
    }

    /// Domain of choice-like kinds, with "" first when optional
    pub fn allowed_values(&self) -> Option<Vec<String>> {
        match &self.kind {
            ParameterKind::Choice { choice } => Some(choice.allowed_values(self.optional)),
            ParameterKind::Bool { .. } => {
                let mut values = Vec::with_capacity(3);
                if self.optional {
                    values.push(String::new());
                }
                values.push("true".to_string());
                values.push("false".to_string());
                Some(values)
            }
            ParameterKind::StringList {
                restrictions: Some(allowed),
                ..
            } => Some(allowed.clone()),
            _ => None,
        }
    }

    /// Display labels parallel to [`allowed_values`](Self::allowed_values)
    pub fn labels(&self) -> Option<Vec<String>> {
        match &self.kind {
            ParameterKind::Choice { choice } => Some(choice.labels(self.optional)),
            _ => self.allowed_values(),
        }
    }
}

fn parse_scalar<T: NumberLiteral>(s: &str, bounds: &Bounds<T>) -> std::result::Result<Option<T>, String> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    number::parse_bounded(s, bounds).map(Some)
}

fn parse_elements<T: NumberLiteral>(items: &[String], bounds: &Bounds<T>) -> std::result::Result<Vec<T>, String> {
    items
        .iter()
        .map(|item| number::parse_bounded(item, bounds))
        .collect()
}
