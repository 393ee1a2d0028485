//! Classification and construction of ITEM / ITEMLIST elements

use std::collections::HashMap;

use crate::error::{Result, ToolEngineError};
use crate::params::{is_boolean_domain, Bounds, Choice, NumberLiteral, Parameter};
use crate::port::{normalize_format, Port, PortDirection};

/// Parameter names that never become parameters or ports
pub const BLACKLISTED_NAMES: &[&str] = &["write_ini", "write_par", "par", "help", "ini"];

pub fn is_blacklisted(name: &str) -> bool {
    BLACKLISTED_NAMES.contains(&name)
}

/// Attributes of an ITEM or ITEMLIST element
#[derive(Debug, Clone, Default)]
pub(crate) struct ItemAttributes {
    pub name: String,
    pub item_type: String,
    pub value: Option<String>,
    pub restrictions: Option<String>,
    pub tags: Vec<String>,
    pub supported_formats: Option<String>,
    pub advanced: Option<bool>,
    pub required: Option<bool>,
    pub description: String,
}

impl ItemAttributes {
    pub fn from_attrs(attrs: &HashMap<String, String>) -> Self {
        let text = |key: &str| attrs.get(key).cloned();
        let flag = |key: &str| attrs.get(key).and_then(|v| parse_flag(v));
        Self {
            name: text("name").unwrap_or_default(),
            item_type: text("type").unwrap_or_default().to_ascii_lowercase(),
            value: text("value"),
            restrictions: text("restrictions").filter(|r| !r.trim().is_empty()),
            tags: text("tags")
                .map(|t| {
                    t.split(',')
                        .map(|tag| tag.trim().to_string())
                        .filter(|tag| !tag.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            supported_formats: text("supported_formats").filter(|f| !f.trim().is_empty()),
            advanced: flag("advanced"),
            required: flag("required"),
            description: text("description").unwrap_or_default(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Comma-separated restriction values, for string items
    fn restriction_values(&self) -> Vec<String> {
        self.restrictions
            .as_deref()
            .map(|r| {
                r.split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Port formats from `supported_formats`, falling back to `restrictions`
    fn formats(&self) -> Vec<String> {
        self.supported_formats
            .as_deref()
            .or(self.restrictions.as_deref())
            .map(|f| f.split(',').filter_map(normalize_format).collect())
            .unwrap_or_default()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// What an item turns into
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemClass {
    Port {
        direction: PortDirection,
        is_prefix: bool,
    },
    Int,
    Double,
    String,
    Choice(Vec<String>),
    Bool,
}

pub(crate) fn classify(item: &ItemAttributes) -> ItemClass {
    let port = |direction, is_prefix| ItemClass::Port {
        direction,
        is_prefix,
    };
    match item.item_type.as_str() {
        "input-file" => port(PortDirection::Input, false),
        "output-file" => port(PortDirection::Output, false),
        "input-prefix" => port(PortDirection::Input, true),
        "output-prefix" => port(PortDirection::Output, true),
        _ if item.has_tag("input file") => port(PortDirection::Input, false),
        _ if item.has_tag("output file") => port(PortDirection::Output, false),
        "int" => ItemClass::Int,
        "float" | "double" => ItemClass::Double,
        _ => {
            let values = item.restriction_values();
            if is_boolean_domain(&values) {
                ItemClass::Bool
            } else if values.is_empty() {
                ItemClass::String
            } else {
                ItemClass::Choice(values)
            }
        }
    }
}

/// A constructed parameter, plus the port it is bound to for file items
#[derive(Debug)]
pub(crate) struct BuiltItem {
    pub parameter: Parameter,
    pub port: Option<(PortDirection, Port)>,
}

/// Build the parameter (and port) for an item
///
/// `list_values` is `Some` for ITEMLIST elements and holds the LISTITEM values.
pub(crate) fn build_item(
    key: String,
    item: &ItemAttributes,
    list_values: Option<&[String]>,
) -> Result<BuiltItem> {
    let class = classify(item);
    let mut port = None;

    let mut parameter = match (&class, list_values) {
        (ItemClass::Port { direction, is_prefix }, list) => {
            let mut p = Port::new(key.clone(), item.formats());
            p.is_prefix = *is_prefix;
            p.multi_file = list.is_some();
            port = Some((*direction, p));
            match list {
                Some(_) => Parameter::file_list(key.clone()),
                None => Parameter::file(key.clone()),
            }
        }
        (ItemClass::Int, None) => Parameter::int(key.clone(), bounds(&key, item)?),
        (ItemClass::Int, Some(_)) => Parameter::int_list(key.clone(), bounds(&key, item)?),
        (ItemClass::Double, None) => Parameter::double(key.clone(), bounds(&key, item)?),
        (ItemClass::Double, Some(_)) => Parameter::double_list(key.clone(), bounds(&key, item)?),
        (ItemClass::String, None) => Parameter::string(key.clone()),
        (ItemClass::Bool, None) => Parameter::boolean(key.clone()),
        (ItemClass::Choice(values), None) => {
            Parameter::choice(key.clone(), Choice::new(values.clone()))
        }
        (ItemClass::String, Some(_)) => Parameter::string_list(key.clone(), None),
        (ItemClass::Bool, Some(_)) | (ItemClass::Choice(_), Some(_)) => {
            Parameter::string_list(key.clone(), Some(item.restriction_values()))
        }
    };

    if parameter.port_name().is_none() {
        let filled = match list_values {
            Some(values) => parameter.fill_from_strings(values),
            None => parameter.fill_from_string(item.value.as_deref().unwrap_or_default()),
        };
        filled.map_err(|err| match err {
            ToolEngineError::InvalidParameterValue { key, reason } => {
                ToolEngineError::parse(key, reason)
            }
            other => other,
        })?;
    }

    apply_common_attributes(&mut parameter, item);
    if let Some((_, p)) = port.as_mut() {
        p.optional = parameter.optional;
        p.description = parameter.description.clone();
    }

    Ok(BuiltItem { parameter, port })
}

fn bounds<T: NumberLiteral>(key: &str, item: &ItemAttributes) -> Result<Bounds<T>> {
    Bounds::parse_restrictions(item.restrictions.as_deref().unwrap_or_default())
        .map_err(|reason| ToolEngineError::parse(key, reason))
}

/// Flags shared by every item kind; explicit attributes win over tags
fn apply_common_attributes(parameter: &mut Parameter, item: &ItemAttributes) {
    parameter.advanced = item.advanced.unwrap_or_else(|| item.has_tag("advanced"));
    let tagged_required = item.has_tag("mandatory") || item.has_tag("required");
    parameter.optional = !item.required.unwrap_or(tagged_required);
    parameter.ignored = item.has_tag("file-ext-override");
    parameter.description = item.description.clone();
}
