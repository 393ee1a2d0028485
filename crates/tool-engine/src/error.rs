//! Error types for the tool engine

use thiserror::Error;

/// Result type alias using ToolEngineError
pub type Result<T> = std::result::Result<T, ToolEngineError>;

/// Errors that can occur while parsing, configuring or running a tool node
#[derive(Debug, Error)]
pub enum ToolEngineError {
    /// Value violates the parameter's type, bounds or domain
    #[error("Invalid value for parameter '{key}': {reason}")]
    InvalidParameterValue { key: String, reason: String },

    /// Descriptor content could not be turned into a configuration
    #[error("Descriptor error at '{key}': {reason}")]
    DescriptorParse { key: String, reason: String },

    /// Descriptor is not well-formed XML
    #[error("Malformed descriptor: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The external tool exited abnormally
    #[error("Tool execution failed with exit code {exit_code}")]
    ExecutionFailed { exit_code: i32, output: String },

    /// No MIME type registered for a produced file
    #[error("No MIME type registered for file '{0}'")]
    NonExistingMimeType(String),

    /// No tool executor registered under this name
    #[error("Unknown tool executor: {0}")]
    UnknownExecutor(String),

    /// No command generator registered under this name
    #[error("Unknown command generator: {0}")]
    UnknownCommandGenerator(String),

    /// Missing required input port data
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// A mandatory output port produced no files
    #[error("Missing output for port: {0}")]
    MissingOutput(String),

    /// Settings do not fit the configuration they are applied to
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// URI conversion failed
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Execution was cancelled
    #[error("Execution cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolEngineError {
    /// Create an invalid parameter value error
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameterValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a descriptor parse error
    pub fn parse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DescriptorParse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Captured tool output, if this error carries any
    pub fn diagnostic_output(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ToolEngineError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}
