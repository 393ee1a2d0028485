//! Node settings and runtime configuration
//!
//! [`NodeSettings`] is the abstract key/value state a host persists for a
//! node instance: parameter values by key plus the selected output type of
//! every output port. [`ToolNodeConfig`] picks the executor, the command
//! generator and the directories a node runs with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::NodeConfiguration;
use crate::error::{Result, ToolEngineError};

/// Persisted parameter values and output type selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    /// Parameter key → serialized value
    pub values: BTreeMap<String, String>,
    /// Index into each output port's format candidates, in port order
    pub output_types: Vec<usize>,
}

impl NodeSettings {
    /// Settings reflecting the current values of `config`, selecting the
    /// first format of every output port
    pub fn from_configuration(config: &NodeConfiguration) -> Self {
        let mut settings = Self {
            values: BTreeMap::new(),
            output_types: vec![0; config.output_ports().len()],
        };
        settings.save_from(config);
        settings
    }

    /// Capture the value of every parameter not bound to a port
    pub fn save_from(&mut self, config: &NodeConfiguration) {
        self.values = config
            .scalar_parameters()
            .map(|p| (p.key().to_string(), p.string_rep()))
            .collect();
    }

    /// Apply stored values to `config`
    ///
    /// Unknown keys and values the parameter rejects are logged and skipped,
    /// so settings written by an older descriptor still load. Returns the
    /// number of values applied.
    pub fn load_into(&self, config: &mut NodeConfiguration) -> usize {
        let mut applied = 0;
        for (key, value) in &self.values {
            let Some(parameter) = config.parameter_mut(key) else {
                log::warn!("Ignoring setting for unknown parameter '{}'", key);
                continue;
            };
            match parameter.fill_from_string(value) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Ignoring stored value: {}", e),
            }
        }
        applied
    }

    /// Check there is one valid selection per output port
    pub fn validate_output_types(&self, config: &NodeConfiguration) -> Result<()> {
        let ports = config.output_ports();
        if self.output_types.len() != ports.len() {
            return Err(ToolEngineError::InvalidSettings(format!(
                "{} output type selection(s) for {} output port(s)",
                self.output_types.len(),
                ports.len()
            )));
        }
        for (port, &index) in ports.iter().zip(&self.output_types) {
            if index >= port.mime_types.len().max(1) {
                return Err(ToolEngineError::InvalidSettings(format!(
                    "output type {} out of range for port '{}'",
                    index, port.name
                )));
            }
        }
        Ok(())
    }

    /// Selected format of the output port at `port_index`
    pub fn output_type<'a>(&self, config: &'a NodeConfiguration, port_index: usize) -> Option<&'a str> {
        let port = config.output_ports().get(port_index)?;
        let index = self.output_types.get(port_index).copied().unwrap_or(0);
        port.mime_types.get(index).map(String::as_str)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Executor, generator and directories a tool node runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolNodeConfig {
    /// Registered executor name
    pub executor: String,
    /// Registered command generator name
    pub generator: String,
    /// Overrides the executable named by the descriptor
    pub executable: Option<PathBuf>,
    /// Parent of per-job directories; the system temp directory when unset
    pub job_root: Option<PathBuf>,
}

impl Default for ToolNodeConfig {
    fn default() -> Self {
        Self {
            executor: "local".to_string(),
            generator: "cli".to_string(),
            executable: None,
            job_root: None,
        }
    }
}

impl ToolNodeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Executable to run for `config`
    ///
    /// The override wins; otherwise the descriptor's executable path and name
    /// are combined, falling back to the tool name.
    pub fn resolve_executable(&self, config: &NodeConfiguration) -> PathBuf {
        if let Some(executable) = &self.executable {
            return executable.clone();
        }
        let name = config.executable_name.as_deref().unwrap_or(&config.name);
        match &config.executable_path {
            Some(path) if config.executable_name.is_some() => path.join(name),
            Some(path) => path.clone(),
            None => PathBuf::from(name),
        }
    }
}
