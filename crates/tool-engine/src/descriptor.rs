//! Node metadata derived from a tool configuration
//!
//! Hosts render palettes and validate connections from this metadata
//! without touching the typed parameter model.

use serde::{Deserialize, Serialize};

use crate::config::NodeConfiguration;
use crate::params::Parameter;
use crate::port::Port;

/// Complete metadata for a tool node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Unique type identifier, `{tool}@{version}`
    pub node_type: String,
    /// Category for UI grouping
    pub category: String,
    /// Human-readable label
    pub label: String,
    pub description: String,
    pub doc_url: String,
    /// Input port definitions
    pub inputs: Vec<PortMetadata>,
    /// Output port definitions
    pub outputs: Vec<PortMetadata>,
    /// Parameters that are not bound to a port, in declaration order
    pub parameters: Vec<ParameterMetadata>,
}

/// Metadata for a port (input or output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Port identifier (used in context keys)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Accepted or produced formats
    pub formats: Vec<String>,
    /// Whether this port must be connected
    pub required: bool,
    /// Whether the port carries a list of files
    pub multiple: bool,
}

/// Metadata for a scalar or list parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    pub key: String,
    pub type_name: String,
    pub default_value: String,
    pub allowed_values: Option<Vec<String>>,
    pub optional: bool,
    pub advanced: bool,
    pub description: String,
}

impl PortMetadata {
    fn from_port(port: &Port) -> Self {
        Self {
            id: port.name.clone(),
            label: port.name.rsplit('.').next().unwrap_or(&port.name).to_string(),
            formats: port.mime_types.clone(),
            required: !port.optional,
            multiple: port.multi_file,
        }
    }
}

impl ParameterMetadata {
    fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            key: parameter.key().to_string(),
            type_name: parameter.type_name().to_string(),
            default_value: parameter.string_rep(),
            allowed_values: parameter.allowed_values(),
            optional: parameter.optional,
            advanced: parameter.advanced,
            description: parameter.description.clone(),
        }
    }
}

impl From<&NodeConfiguration> for TaskMetadata {
    fn from(config: &NodeConfiguration) -> Self {
        Self {
            node_type: format!("{}@{}", config.name, config.version),
            category: config.category.clone(),
            label: config.name.clone(),
            description: config.description.clone(),
            doc_url: config.doc_url.clone(),
            inputs: config.input_ports().iter().map(PortMetadata::from_port).collect(),
            outputs: config.output_ports().iter().map(PortMetadata::from_port).collect(),
            parameters: config
                .scalar_parameters()
                .filter(|p| !p.ignored)
                .map(ParameterMetadata::from_parameter)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_descriptor;

    #[test]
    fn test_metadata_from_configuration() {
        let config = parse_descriptor(
            r#"<tool name="Sorter" version="1.2" category="Tables">
              <PARAMETERS><NODE name="sort">
                <ITEM name="in" type="input-file" supported_formats="*.csv" required="true"/>
                <ITEM name="order" type="string" value="asc" restrictions="asc,desc"/>
                <ITEM name="skip" type="string" tags="file-ext-override"/>
              </NODE></PARAMETERS>
            </tool>"#,
        )
        .unwrap();

        let meta = TaskMetadata::from(&config);
        assert_eq!(meta.node_type, "Sorter@1.2");
        assert_eq!(meta.category, "Tables");
        assert_eq!(meta.inputs.len(), 1);
        assert_eq!(meta.inputs[0].label, "in");
        assert!(meta.inputs[0].required);
        assert_eq!(meta.parameters.len(), 1);
        assert_eq!(meta.parameters[0].key, "sort.order");
        assert_eq!(meta.parameters[0].default_value, "asc");
        assert_eq!(
            meta.parameters[0].allowed_values.as_deref(),
            Some(&["".to_string(), "asc".to_string(), "desc".to_string()][..])
        );

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("nodeType")); // camelCase
    }
}
