//! Tool descriptor parser
//!
//! Reads a descriptor document as a stream of XML events and assembles a
//! [`NodeConfiguration`]. Parsing is driven by a single event loop over an
//! explicit stack of parser states:
//!
//! - `Root` handles the `tool` element and its simple children
//! - `Cli`, `Parameters` and `Relocators` are pushed when their element opens
//!   and own every event until the matching close, then pop back to `Root`
//! - `Text` collects character data for `description`, `manual`, ...
//! - `Skip` swallows elements the parser does not understand
//!
//! Element and attribute names are matched case-insensitively.
//!
//! # Example
//!
//! ```ignore
//! let config = tool_engine::parse_descriptor(&std::fs::read_to_string("sorter.ctd")?)?;
//! for key in config.keys() {
//!     println!("{key}");
//! }
//! ```

mod item;

use std::collections::HashMap;
use std::path::PathBuf;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::{CliElement, NodeConfiguration, Relocator};
use crate::error::{Result, ToolEngineError};

pub use item::{is_blacklisted, BLACKLISTED_NAMES};

use item::ItemAttributes;

/// Parse descriptor text into a node configuration
pub fn parse_descriptor(text: &str) -> Result<NodeConfiguration> {
    let mut parser = DescriptorParser::new();
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.handle(open_event(&e)?)?,
            Event::Empty(e) => {
                let event = open_event(&e)?;
                let name = match &event {
                    DescriptorEvent::Open { name, .. } => name.clone(),
                    _ => String::new(),
                };
                parser.handle(event)?;
                parser.handle(DescriptorEvent::Close { name })?;
            }
            Event::End(e) => parser.handle(DescriptorEvent::Close {
                name: String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase(),
            })?,
            Event::Text(t) => parser.handle(DescriptorEvent::Text(t.unescape()?.into_owned()))?,
            Event::CData(c) => {
                parser.handle(DescriptorEvent::Text(String::from_utf8_lossy(&c).into_owned()))?
            }
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish()
}

/// Join section segments into a dotted key
///
/// A literal `1` in the second position is dropped: descriptors written by
/// some tool suites wrap every tool's parameters in an instance section
/// named `1` (`Tool.1.param`), which is not part of the parameter key.
pub fn normalize_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .enumerate()
        .filter(|(i, s)| !(*i == 1 && s.as_ref() == "1"))
        .map(|(_, s)| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

/// Normalize an already-dotted reference (CLI mappings, relocators)
fn normalize_reference(reference: &str) -> String {
    let segments: Vec<&str> = reference.split('.').collect();
    normalize_path(&segments)
}

/// Parser input, decoupled from the XML reader's borrowed events
#[derive(Debug, Clone, PartialEq)]
enum DescriptorEvent {
    Open {
        name: String,
        attrs: HashMap<String, String>,
    },
    Close {
        name: String,
    },
    Text(String),
}

fn open_event(e: &BytesStart<'_>) -> Result<DescriptorEvent> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(DescriptorEvent::Open { name, attrs })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Description,
    Manual,
    ExecutableName,
    ExecutablePath,
}

#[derive(Debug)]
struct PendingList {
    item: ItemAttributes,
    values: Vec<String>,
}

#[derive(Debug, Default)]
struct ParametersState {
    /// Names of the open NODE sections
    path: Vec<String>,
    list: Option<PendingList>,
}

#[derive(Debug)]
enum ParserState {
    Root,
    Text {
        field: TextField,
        buffer: String,
        depth: usize,
    },
    Cli {
        current: Option<CliElement>,
    },
    Parameters(ParametersState),
    Relocators,
    Skip {
        depth: usize,
    },
}

/// Outcome of feeding one event to the state on top of the stack
enum Transition {
    Stay(ParserState),
    Push(ParserState, ParserState),
    Pop,
}

struct DescriptorParser {
    stack: Vec<ParserState>,
    config: NodeConfiguration,
    seen_tool: bool,
}

impl DescriptorParser {
    fn new() -> Self {
        Self {
            stack: vec![ParserState::Root],
            config: NodeConfiguration::default(),
            seen_tool: false,
        }
    }

    fn handle(&mut self, event: DescriptorEvent) -> Result<()> {
        let state = self.stack.pop().unwrap_or(ParserState::Root);
        let transition = match state {
            ParserState::Root => self.on_root(event)?,
            ParserState::Text {
                field,
                buffer,
                depth,
            } => self.on_text(field, buffer, depth, event),
            ParserState::Cli { current } => self.on_cli(current, event),
            ParserState::Parameters(state) => self.on_parameters(state, event)?,
            ParserState::Relocators => self.on_relocators(event),
            ParserState::Skip { depth } => on_skip(depth, event),
        };
        match transition {
            Transition::Stay(state) => self.stack.push(state),
            Transition::Push(parent, child) => {
                self.stack.push(parent);
                self.stack.push(child);
            }
            Transition::Pop => {}
        }
        if self.stack.is_empty() {
            self.stack.push(ParserState::Root);
        }
        Ok(())
    }

    fn on_root(&mut self, event: DescriptorEvent) -> Result<Transition> {
        let DescriptorEvent::Open { name, attrs } = event else {
            return Ok(Transition::Stay(ParserState::Root));
        };
        let text = |field| ParserState::Text {
            field,
            buffer: String::new(),
            depth: 0,
        };
        let child = match name.as_str() {
            "tool" => {
                let attr = |key: &str| attrs.get(key).cloned().unwrap_or_default();
                self.config.name = attr("name");
                self.config.version = attr("version");
                self.config.category = attr("category");
                self.config.doc_url = attr("docurl");
                self.seen_tool = true;
                return Ok(Transition::Stay(ParserState::Root));
            }
            "description" => text(TextField::Description),
            "manual" => text(TextField::Manual),
            "executablename" => text(TextField::ExecutableName),
            "executablepath" => text(TextField::ExecutablePath),
            "cli" => ParserState::Cli { current: None },
            "parameters" => ParserState::Parameters(ParametersState::default()),
            "relocators" => ParserState::Relocators,
            other => {
                log::trace!("Skipping unknown descriptor element '{}'", other);
                ParserState::Skip { depth: 0 }
            }
        };
        Ok(Transition::Push(ParserState::Root, child))
    }

    fn on_text(
        &mut self,
        field: TextField,
        mut buffer: String,
        depth: usize,
        event: DescriptorEvent,
    ) -> Transition {
        match event {
            DescriptorEvent::Text(t) => {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(&t);
            }
            DescriptorEvent::Open { .. } => {
                return Transition::Stay(ParserState::Text {
                    field,
                    buffer,
                    depth: depth + 1,
                })
            }
            DescriptorEvent::Close { .. } if depth > 0 => {
                return Transition::Stay(ParserState::Text {
                    field,
                    buffer,
                    depth: depth - 1,
                })
            }
            DescriptorEvent::Close { .. } => {
                let value = buffer.trim().to_string();
                match field {
                    TextField::Description => self.config.description = value,
                    TextField::Manual => self.config.manual = value,
                    TextField::ExecutableName => {
                        self.config.executable_name = (!value.is_empty()).then_some(value)
                    }
                    TextField::ExecutablePath => {
                        self.config.executable_path =
                            (!value.is_empty()).then(|| PathBuf::from(value))
                    }
                }
                return Transition::Pop;
            }
        }
        Transition::Stay(ParserState::Text {
            field,
            buffer,
            depth,
        })
    }

    fn on_cli(&mut self, mut current: Option<CliElement>, event: DescriptorEvent) -> Transition {
        match event {
            DescriptorEvent::Open { name, attrs } => match name.as_str() {
                "clielement" => {
                    current = Some(CliElement {
                        option_identifier: attrs.get("optionidentifier").cloned().unwrap_or_default(),
                        is_list: attrs.get("islist").is_some_and(|v| v.eq_ignore_ascii_case("true")),
                        mappings: Vec::new(),
                    });
                }
                "mapping" => {
                    if let (Some(element), Some(reference)) =
                        (current.as_mut(), attrs.get("referencename"))
                    {
                        element.mappings.push(normalize_reference(reference));
                    }
                }
                _ => {}
            },
            DescriptorEvent::Close { name } => match name.as_str() {
                "clielement" => {
                    if let Some(element) = current.take() {
                        self.config.cli.push(element);
                    }
                }
                "cli" => return Transition::Pop,
                _ => {}
            },
            DescriptorEvent::Text(_) => {}
        }
        Transition::Stay(ParserState::Cli { current })
    }

    fn on_parameters(
        &mut self,
        mut state: ParametersState,
        event: DescriptorEvent,
    ) -> Result<Transition> {
        match event {
            DescriptorEvent::Open { name, attrs } => match name.as_str() {
                "node" => {
                    let section = attrs.get("name").cloned().unwrap_or_default();
                    let instance_section = state.path.len() == 1 && section == "1";
                    state.path.push(section);
                    // The instance section shares its parent's key
                    if instance_section {
                        return Ok(Transition::Stay(ParserState::Parameters(state)));
                    }
                    if let Some(description) = attrs.get("description").filter(|d| !d.is_empty()) {
                        self.config
                            .set_section_description(normalize_path(&state.path), description.clone());
                    }
                }
                "item" => {
                    let item = ItemAttributes::from_attrs(&attrs);
                    self.add_item(&state.path, &item, None)?;
                }
                "itemlist" => {
                    state.list = Some(PendingList {
                        item: ItemAttributes::from_attrs(&attrs),
                        values: Vec::new(),
                    });
                }
                "listitem" => {
                    if let Some(list) = state.list.as_mut() {
                        list.values
                            .push(attrs.get("value").cloned().unwrap_or_default());
                    }
                }
                other => log::trace!("Ignoring '{}' inside PARAMETERS", other),
            },
            DescriptorEvent::Close { name } => match name.as_str() {
                "node" => {
                    state.path.pop();
                }
                "itemlist" => {
                    if let Some(list) = state.list.take() {
                        self.add_item(&state.path, &list.item, Some(list.values.as_slice()))?;
                    }
                }
                "parameters" => return Ok(Transition::Pop),
                _ => {}
            },
            DescriptorEvent::Text(_) => {}
        }
        Ok(Transition::Stay(ParserState::Parameters(state)))
    }

    fn on_relocators(&mut self, event: DescriptorEvent) -> Transition {
        match event {
            DescriptorEvent::Open { name, attrs } if name == "relocator" => {
                let reference = attrs.get("reference").map(|r| normalize_reference(r));
                match (reference, attrs.get("pattern")) {
                    (Some(reference), Some(pattern)) => {
                        self.config.add_relocator(Relocator::new(reference, pattern.clone()))
                    }
                    _ => log::warn!("Ignoring relocator without reference or pattern"),
                }
            }
            DescriptorEvent::Close { name } if name == "relocators" => return Transition::Pop,
            _ => {}
        }
        Transition::Stay(ParserState::Relocators)
    }

    fn add_item(
        &mut self,
        path: &[String],
        item: &ItemAttributes,
        list_values: Option<&[String]>,
    ) -> Result<()> {
        if item.name.is_empty() {
            log::warn!("Ignoring unnamed item in section '{}'", normalize_path(path));
            return Ok(());
        }
        if is_blacklisted(&item.name) {
            log::debug!("Dropping blacklisted parameter '{}'", item.name);
            return Ok(());
        }

        let mut segments = path.to_vec();
        segments.push(item.name.clone());
        let key = normalize_path(&segments);

        let built = item::build_item(key, item, list_values)?;
        if let Some((direction, port)) = built.port {
            self.config.add_port(direction, port)?;
        }
        self.config.add_parameter(built.parameter)
    }

    fn finish(mut self) -> Result<NodeConfiguration> {
        if !self.seen_tool {
            return Err(ToolEngineError::parse("tool", "missing root tool element"));
        }
        if self.config.name.is_empty() {
            return Err(ToolEngineError::parse("tool", "missing 'name' attribute"));
        }
        if self.config.version.is_empty() {
            return Err(ToolEngineError::parse("tool", "missing 'version' attribute"));
        }
        if self.stack.len() > 1 {
            log::warn!(
                "Descriptor for '{}' ended with {} unclosed sections",
                self.config.name,
                self.stack.len() - 1
            );
        }
        self.config.check_port_bindings()?;

        log::debug!(
            "Parsed descriptor '{}' {}: {} parameters, {} inputs, {} outputs",
            self.config.name,
            self.config.version,
            self.config.parameters().len(),
            self.config.input_ports().len(),
            self.config.output_ports().len()
        );
        self.stack.clear();
        Ok(self.config)
    }
}

fn on_skip(depth: usize, event: DescriptorEvent) -> Transition {
    match event {
        DescriptorEvent::Open { .. } => Transition::Stay(ParserState::Skip { depth: depth + 1 }),
        DescriptorEvent::Close { .. } if depth == 0 => Transition::Pop,
        DescriptorEvent::Close { .. } => Transition::Stay(ParserState::Skip { depth: depth - 1 }),
        DescriptorEvent::Text(_) => Transition::Stay(ParserState::Skip { depth }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Bounds, ParameterKind};
    use crate::port::PortDirection;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tool name="Demo" version="1.0" category="Test" docurl="http://example.org/demo">
  <description>Demo tool</description>
  <PARAMETERS>
    <NODE name="sec" description="Section">
      <ITEM name="x" type="int" value="5" restrictions="0:10"/>
    </NODE>
  </PARAMETERS>
</tool>"#;

    const FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tool name="FileFilter" version="2.1" category="Utilities" docurl="http://example.org/ff">
  <description><![CDATA[Filters files]]></description>
  <manual>Reads a table and writes the filtered rows.</manual>
  <executableName>FileFilter</executableName>
  <cli>
    <clielement optionIdentifier="-in" isList="false">
      <mapping referenceName="FileFilter.1.in"/>
    </clielement>
    <clielement optionIdentifier="-out" isList="false">
      <mapping referenceName="FileFilter.1.out"/>
    </clielement>
  </cli>
  <PARAMETERS version="1.6.2">
    <NODE name="FileFilter" description="Filters rows">
      <ITEM name="version" value="2.1" type="string" tags="advanced"/>
      <NODE name="1" description="Instance section">
        <ITEM name="in" value="" type="input-file" tags="input file,required" supported_formats="*.csv,*.tsv" description="input table"/>
        <ITEM name="out" value="" type="output-file" tags="output file,required" supported_formats="*.csv"/>
        <ITEM name="threshold" value="0.5" type="double" restrictions="0:1"/>
        <ITEM name="mode" value="fast" type="string" restrictions="fast,slow"/>
        <ITEM name="verbose" value="false" type="string" restrictions="true,false"/>
        <ITEM name="help" value="" type="string"/>
        <ITEM name="write_ini" value="" type="output-file"/>
        <ITEMLIST name="columns" type="int" restrictions="0:">
          <LISTITEM value="1"/>
          <LISTITEM value="3"/>
        </ITEMLIST>
        <NODE name="algorithm" description="Algorithm settings">
          <ITEM name="rounds" value="3" type="int" advanced="true"/>
        </NODE>
      </NODE>
    </NODE>
  </PARAMETERS>
  <relocators>
    <relocator reference="FileFilter.1.out" pattern="%TEMP%/out.csv"/>
  </relocators>
</tool>"#;

    #[test]
    fn test_minimal_descriptor() {
        let config = parse_descriptor(MINIMAL).unwrap();
        assert_eq!(config.name, "Demo");
        assert_eq!(config.version, "1.0");
        assert_eq!(config.category, "Test");
        assert_eq!(config.doc_url, "http://example.org/demo");
        assert_eq!(config.description, "Demo tool");

        let keys: Vec<&str> = config.keys().collect();
        assert_eq!(keys, vec!["sec.x"]);
        assert_eq!(
            config.parameter("sec.x").unwrap().kind(),
            &ParameterKind::Int {
                value: Some(5),
                bounds: Bounds::new(0, 10)
            }
        );
        assert_eq!(config.section_description("sec"), Some("Section"));
    }

    #[test]
    fn test_full_descriptor() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = parse_descriptor(FULL).unwrap();
        assert_eq!(config.executable_name.as_deref(), Some("FileFilter"));
        assert_eq!(config.description, "Filters files");

        let keys: Vec<&str> = config.keys().collect();
        assert_eq!(
            keys,
            vec![
                "FileFilter.version",
                "FileFilter.in",
                "FileFilter.out",
                "FileFilter.threshold",
                "FileFilter.mode",
                "FileFilter.verbose",
                "FileFilter.columns",
                "FileFilter.algorithm.rounds",
            ]
        );

        assert_eq!(config.input_ports().len(), 1);
        assert_eq!(config.output_ports().len(), 1);
        let input = &config.input_ports()[0];
        assert_eq!(input.name, "FileFilter.in");
        assert_eq!(input.mime_types, vec!["csv".to_string(), "tsv".to_string()]);
        assert!(!input.optional);
        assert_eq!(input.description, "input table");

        assert_eq!(config.parameter("FileFilter.verbose").unwrap().type_name(), "bool");
        assert_eq!(config.parameter("FileFilter.mode").unwrap().type_name(), "choice");
        assert_eq!(
            config.parameter("FileFilter.columns").unwrap().values(),
            vec!["1".to_string(), "3".to_string()]
        );
        assert!(config.parameter("FileFilter.algorithm.rounds").unwrap().advanced);
        assert!(config.parameter("FileFilter.version").unwrap().advanced);

        assert_eq!(
            config.section_description("FileFilter.algorithm"),
            Some("Algorithm settings")
        );
        assert_eq!(config.cli.len(), 2);
        assert_eq!(config.cli[0].mappings, vec!["FileFilter.in".to_string()]);
        assert_eq!(config.relocators().len(), 1);
        assert_eq!(config.relocators()[0].reference, "FileFilter.out");
    }

    #[test]
    fn test_instance_section_keeps_tool_description() {
        let config = parse_descriptor(FULL).unwrap();
        assert_eq!(config.section_description("FileFilter"), Some("Filters rows"));
        assert!(!config
            .section_descriptions()
            .values()
            .any(|d| d == "Instance section"));
    }

    #[test]
    fn test_port_item_yields_no_scalar_parameter() {
        let text = r#"<tool name="T" version="1"><PARAMETERS><NODE name="s">
            <ITEM name="in" type="input-file" tags="input file"/>
        </NODE></PARAMETERS></tool>"#;
        let config = parse_descriptor(text).unwrap();
        assert_eq!(config.input_ports().len(), 1);
        assert_eq!(config.output_ports().len(), 0);
        assert_eq!(config.scalar_parameters().count(), 0);
        assert_eq!(config.input_ports()[0].name, "s.in");
    }

    #[test]
    fn test_blacklisted_item_yields_nothing() {
        let text = r#"<tool name="T" version="1"><PARAMETERS><NODE name="s">
            <ITEM name="help" type="string" value=""/>
        </NODE></PARAMETERS></tool>"#;
        let config = parse_descriptor(text).unwrap();
        assert_eq!(config.parameters().len(), 0);
        assert!(config.input_ports().is_empty());
        assert!(config.output_ports().is_empty());
    }

    #[test]
    fn test_output_prefix_item_list() {
        let text = r#"<tool name="T" version="1"><PARAMETERS><NODE name="s">
            <ITEMLIST name="outs" type="output-prefix" supported_formats="*.txt"/>
        </NODE></PARAMETERS></tool>"#;
        let config = parse_descriptor(text).unwrap();
        let port = config.port(PortDirection::Output, "s.outs").unwrap();
        assert!(port.is_prefix);
        assert!(port.multi_file);
        assert_eq!(config.parameter("s.outs").unwrap().type_name(), "file-list");
    }

    #[test]
    fn test_malformed_number_is_error() {
        let text = r#"<tool name="T" version="1"><PARAMETERS><NODE name="s">
            <ITEM name="n" type="int" value="1.5"/>
        </NODE></PARAMETERS></tool>"#;
        let err = parse_descriptor(text).unwrap_err();
        assert!(matches!(err, ToolEngineError::DescriptorParse { ref key, .. } if key == "s.n"));
    }

    #[test]
    fn test_missing_tool_is_error() {
        assert!(parse_descriptor("<other/>").is_err());
        assert!(parse_descriptor(r#"<tool version="1"/>"#).is_err());
        assert!(parse_descriptor(r#"<tool name="T"/>"#).is_err());
    }

    #[test]
    fn test_missing_sections_tolerated() {
        let config = parse_descriptor(r#"<tool name="T" version="1"><citations><c doi="x"/></citations></tool>"#)
            .unwrap();
        assert!(config.parameters().is_empty());
        assert!(config.description.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_descriptor(FULL).unwrap();
        let second = parse_descriptor(FULL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(&["Tool", "1", "in"]), "Tool.in");
        assert_eq!(normalize_path(&["sec", "x"]), "sec.x");
        assert_eq!(normalize_path(&["1", "1", "x"]), "1.x");
        assert_eq!(normalize_path(&["a", "b", "1"]), "a.b.1");
        assert_eq!(normalize_reference("Tool.1.out"), "Tool.out");
    }
}
