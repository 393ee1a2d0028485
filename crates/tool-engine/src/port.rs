//! Port model
//!
//! Ports are the typed file slots of a tool node. Each port carries an
//! ordered list of candidate formats (file extensions registered in the
//! MIME registry); the first candidate is the default.

use serde::{Deserialize, Serialize};

/// Whether a port consumes or produces files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// Definition of an input or output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port name; equal to the key of the file parameter bound to it
    pub name: String,
    /// Candidate formats, in preference order
    pub mime_types: Vec<String>,
    pub optional: bool,
    /// Accepts or produces a list of files
    pub multi_file: bool,
    /// The bound value is a path prefix rather than a complete file name
    pub is_prefix: bool,
    pub description: String,
}

impl Port {
    /// Create a mandatory single-file port
    pub fn new(name: impl Into<String>, mime_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            mime_types,
            optional: false,
            multi_file: false,
            is_prefix: false,
            description: String::new(),
        }
    }

    /// Mark this port optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark this port as carrying a list of files
    pub fn multi_file(mut self) -> Self {
        self.multi_file = true;
        self
    }

    /// Mark this port as a path prefix
    pub fn prefix(mut self) -> Self {
        self.is_prefix = true;
        self
    }

    /// Whether `format` is one of this port's candidates (case-insensitive)
    pub fn accepts(&self, format: &str) -> bool {
        self.mime_types.iter().any(|m| m.eq_ignore_ascii_case(format))
    }
}

/// Normalize a supported-format token such as `*.csv` or `.csv` to `csv`
pub fn normalize_format(token: &str) -> Option<String> {
    let token = token.trim();
    let token = token.strip_prefix('*').unwrap_or(token);
    let token = token.strip_prefix('.').unwrap_or(token);
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_builders() {
        let port = Port::new("out", vec!["csv".to_string()]).optional().multi_file();
        assert_eq!(port.name, "out");
        assert!(port.optional);
        assert!(port.multi_file);
        assert!(!port.is_prefix);
        assert!(port.accepts("CSV"));
        assert!(!port.accepts("tsv"));
    }

    #[test]
    fn test_normalize_format() {
        assert_eq!(normalize_format("*.csv").as_deref(), Some("csv"));
        assert_eq!(normalize_format(" .fa.gz ").as_deref(), Some("fa.gz"));
        assert_eq!(normalize_format("mzML").as_deref(), Some("mzML"));
        assert_eq!(normalize_format("*."), None);
    }

    #[test]
    fn test_port_serialization() {
        let port = Port::new("in", vec!["txt".to_string()]).prefix();
        let json = serde_json::to_value(&port).unwrap();
        assert_eq!(json["mimeTypes"][0], "txt");
        assert_eq!(json["isPrefix"], true);
        assert_eq!(json["multiFile"], false);
    }
}
