//! Node configuration assembled from a tool descriptor

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolEngineError};
use crate::params::Parameter;
use crate::port::{Port, PortDirection};

/// Rewrites the path of a parameter in the generated command
///
/// The pattern may contain `%TEMP%` (the job working directory) and
/// `%FILE%` (the file name of the original path). Relative results are
/// resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocator {
    /// Key of the parameter whose path is rewritten
    pub reference: String,
    pub pattern: String,
}

impl Relocator {
    pub fn new(reference: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            pattern: pattern.into(),
        }
    }

    /// Location the tool writes to instead of `original`
    pub fn relocate(&self, original: &Path, work_dir: &Path) -> PathBuf {
        let file_name = original
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expanded = self
            .pattern
            .replace("%TEMP%", &work_dir.to_string_lossy())
            .replace("%FILE%", &file_name);
        let path = PathBuf::from(expanded);
        if path.is_relative() {
            work_dir.join(path)
        } else {
            path
        }
    }
}

/// One command-line element: an option flag followed by mapped parameter values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliElement {
    /// Flag emitted before the values, e.g. `-in`; may be empty
    pub option_identifier: String,
    pub is_list: bool,
    /// Keys of the parameters whose values follow the flag
    pub mappings: Vec<String>,
}

/// Parsed tool: metadata, ordered parameters, ports and relocators
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfiguration {
    pub name: String,
    pub version: String,
    pub description: String,
    pub manual: String,
    pub category: String,
    pub doc_url: String,
    pub executable_name: Option<String>,
    pub executable_path: Option<PathBuf>,
    pub cli: Vec<CliElement>,
    parameters: Vec<Parameter>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    input_ports: Vec<Port>,
    output_ports: Vec<Port>,
    relocators: Vec<Relocator>,
    section_descriptions: BTreeMap<String, String>,
}

impl NodeConfiguration {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Append a parameter; keys must be unique
    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<()> {
        if self.index.contains_key(parameter.key()) {
            return Err(ToolEngineError::parse(
                parameter.key(),
                "duplicate parameter key",
            ));
        }
        self.index
            .insert(parameter.key().to_string(), self.parameters.len());
        self.parameters.push(parameter);
        Ok(())
    }

    /// Append a port; names must be unique per direction
    pub fn add_port(&mut self, direction: PortDirection, port: Port) -> Result<()> {
        if self.port(direction, &port.name).is_some() {
            return Err(ToolEngineError::parse(&port.name, "duplicate port"));
        }
        match direction {
            PortDirection::Input => self.input_ports.push(port),
            PortDirection::Output => self.output_ports.push(port),
        }
        Ok(())
    }

    pub fn add_relocator(&mut self, relocator: Relocator) {
        self.relocators.push(relocator);
    }

    pub fn set_section_description(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.section_descriptions.insert(path.into(), text.into());
    }

    /// Parameter keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.key())
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameters that are not bound to a port
    pub fn scalar_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.port_name().is_none())
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.lookup(key).map(|i| &self.parameters[i])
    }

    /// Mutable access for value updates; the key itself cannot change
    pub fn parameter_mut(&mut self, key: &str) -> Option<&mut Parameter> {
        let i = self.lookup(key)?;
        Some(&mut self.parameters[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn input_ports(&self) -> &[Port] {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &[Port] {
        &self.output_ports
    }

    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&Port> {
        let ports = match direction {
            PortDirection::Input => &self.input_ports,
            PortDirection::Output => &self.output_ports,
        };
        ports.iter().find(|p| p.name == name)
    }

    /// The file parameter bound to the port `port_name`
    pub fn file_parameter(&self, port_name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.port_name() == Some(port_name))
    }

    pub fn file_parameter_mut(&mut self, port_name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.port_name() == Some(port_name))
    }

    pub fn relocators(&self) -> &[Relocator] {
        &self.relocators
    }

    pub fn relocator_for(&self, key: &str) -> Option<&Relocator> {
        self.relocators.iter().find(|r| r.reference == key)
    }

    /// Section path → description, for grouping parameters in hosts
    pub fn section_descriptions(&self) -> &BTreeMap<String, String> {
        &self.section_descriptions
    }

    pub fn section_description(&self, path: &str) -> Option<&str> {
        self.section_descriptions.get(path).map(String::as_str)
    }

    /// Check that file parameters and ports are bound one-to-one
    pub fn check_port_bindings(&self) -> Result<()> {
        for parameter in &self.parameters {
            if let Some(port) = parameter.port_name() {
                let bound = self.port(PortDirection::Input, port).is_some() as usize
                    + self.port(PortDirection::Output, port).is_some() as usize;
                if bound != 1 {
                    return Err(ToolEngineError::parse(
                        parameter.key(),
                        format!("file parameter must reference exactly one port, found {}", bound),
                    ));
                }
            }
        }
        for port in self.input_ports.iter().chain(&self.output_ports) {
            let count = self
                .parameters
                .iter()
                .filter(|p| p.port_name() == Some(port.name.as_str()))
                .count();
            if count != 1 {
                return Err(ToolEngineError::parse(
                    &port.name,
                    format!("port must be bound to exactly one file parameter, found {}", count),
                ));
            }
        }
        Ok(())
    }

    /// Self-description for hosts and node palettes
    pub fn task_metadata(&self) -> crate::descriptor::TaskMetadata {
        crate::descriptor::TaskMetadata::from(self)
    }

    /// Rebuild the key index, e.g. after deserialization
    pub fn reindex(&mut self) {
        self.index = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (p.key().to_string(), i))
            .collect();
    }

    fn lookup(&self, key: &str) -> Option<usize> {
        match self.index.get(key) {
            Some(&i) => Some(i),
            // Index is skipped by serde; fall back to a scan
            None if self.index.len() != self.parameters.len() => {
                self.parameters.iter().position(|p| p.key() == key)
            }
            None => None,
        }
    }
}
