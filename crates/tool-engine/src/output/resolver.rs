//! Maps produced files back to typed output payloads

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mime::Mime;
use url::Url;

use super::converter::{file_uri, ConverterChain};
use super::mime_registry::MimeRegistry;
use crate::config::NodeConfiguration;
use crate::error::{Result, ToolEngineError};
use crate::port::Port;

/// Files published on one output port
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPayload {
    pub port: String,
    pub uris: Vec<Url>,
    pub mime: Mime,
}

impl OutputPayload {
    /// Local paths of the `file://` URIs in this payload
    pub fn paths(&self) -> Vec<PathBuf> {
        self.uris
            .iter()
            .filter_map(|uri| uri.to_file_path().ok())
            .collect()
    }
}

/// Resolves every output port of a configuration after a successful run
#[derive(Clone, Default)]
pub struct OutputResolver {
    mime: MimeRegistry,
    converters: HashMap<String, ConverterChain>,
}

impl OutputResolver {
    pub fn new(mime: MimeRegistry) -> Self {
        Self {
            mime,
            converters: HashMap::new(),
        }
    }

    /// Set the converter chain for a port
    pub fn with_converters(mut self, port: impl Into<String>, chain: ConverterChain) -> Self {
        self.converters.insert(port.into(), chain);
        self
    }

    pub fn mime_registry(&self) -> &MimeRegistry {
        &self.mime
    }

    /// Payloads for all output ports, in port order
    ///
    /// Optional ports without files are skipped; a mandatory port without
    /// files fails the whole resolution.
    pub fn resolve(&self, config: &NodeConfiguration) -> Result<Vec<OutputPayload>> {
        let mut payloads = Vec::with_capacity(config.output_ports().len());
        for port in config.output_ports() {
            if let Some(payload) = self.resolve_port(config, port)? {
                payloads.push(payload);
            }
        }
        Ok(payloads)
    }

    pub fn resolve_port(
        &self,
        config: &NodeConfiguration,
        port: &Port,
    ) -> Result<Option<OutputPayload>> {
        let files = collect_files(config, port)?;
        let Some(first) = files.first() else {
            if port.optional {
                log::debug!("Optional output port '{}' produced no files", port.name);
                return Ok(None);
            }
            return Err(ToolEngineError::MissingOutput(port.name.clone()));
        };

        // Only the first file decides the type of the whole port
        let file_name = first
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = self.mime.resolve(&file_name)?;

        let chain = self.converters.get(&port.name);
        let uris = files
            .iter()
            .map(|path| {
                let uri = file_uri(path)?;
                match chain {
                    Some(chain) => chain.apply(uri),
                    None => Ok(uri),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Output port '{}' resolved to {} file(s) of type {}",
            port.name,
            uris.len(),
            mime
        );
        Ok(Some(OutputPayload {
            port: port.name.clone(),
            uris,
            mime,
        }))
    }
}

/// Files allocated for `port`; prefix ports also pick up every sibling file
/// whose name starts with the allocated prefix
pub fn collect_files(config: &NodeConfiguration, port: &Port) -> Result<Vec<PathBuf>> {
    let allocated: Vec<PathBuf> = config
        .file_parameter(&port.name)
        .map(|p| p.values().into_iter().map(PathBuf::from).collect())
        .unwrap_or_default();

    if !port.is_prefix {
        return Ok(allocated);
    }

    let mut files = Vec::new();
    for prefix in &allocated {
        files.extend(prefixed_siblings(prefix)?);
    }
    Ok(files)
}

fn prefixed_siblings(prefix: &Path) -> Result<Vec<PathBuf>> {
    let (Some(dir), Some(stem)) = (prefix.parent(), prefix.file_name()) else {
        return Ok(Vec::new());
    };
    let stem = stem.to_string_lossy();

    let mut matches = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_match = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(stem.as_ref()));
        if is_match && path != prefix && path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FnConverter;
    use crate::params::Parameter;
    use crate::port::PortDirection;

    fn config_with_output(port: Port, parameter: Parameter) -> NodeConfiguration {
        let mut config = NodeConfiguration::new("Tool", "1");
        config.add_parameter(parameter).unwrap();
        config.add_port(PortDirection::Output, port).unwrap();
        config
    }

    #[test]
    fn test_single_csv_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.csv");
        std::fs::write(&out, "a,b\n1,2\n").unwrap();

        let mut param = Parameter::file("sort.out");
        param.fill_from_string(&out.to_string_lossy()).unwrap();
        let config = config_with_output(Port::new("sort.out", vec!["csv".into()]), param);

        let payloads = OutputResolver::default().resolve(&config).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].port, "sort.out");
        assert_eq!(payloads[0].mime, mime::TEXT_CSV);
        assert_eq!(payloads[0].paths(), vec![out]);
    }

    #[test]
    fn test_mime_from_first_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.unknownext");

        let mut param = Parameter::file_list("out");
        param
            .fill_from_strings(&[
                first.to_string_lossy().into_owned(),
                second.to_string_lossy().into_owned(),
            ])
            .unwrap();
        let config = config_with_output(Port::new("out", vec![]).multi_file(), param);

        let payloads = OutputResolver::default().resolve(&config).unwrap();
        assert_eq!(payloads[0].mime, mime::TEXT_CSV);
        assert_eq!(payloads[0].uris.len(), 2);
    }

    #[test]
    fn test_unregistered_extension_fails() {
        let mut param = Parameter::file("out");
        param.fill_from_string("/tmp/result.weird").unwrap();
        let config = config_with_output(Port::new("out", vec![]), param);

        let err = OutputResolver::default().resolve(&config).unwrap_err();
        assert!(matches!(err, ToolEngineError::NonExistingMimeType(_)));
    }

    #[test]
    fn test_optional_and_mandatory_empty_ports() {
        let config = config_with_output(Port::new("out", vec![]).optional(), Parameter::file("out"));
        assert!(OutputResolver::default().resolve(&config).unwrap().is_empty());

        let config = config_with_output(Port::new("out", vec![]), Parameter::file("out"));
        assert!(matches!(
            OutputResolver::default().resolve(&config),
            Err(ToolEngineError::MissingOutput(port)) if port == "out"
        ));
    }

    #[test]
    fn test_converters_apply_per_port() {
        let mut param = Parameter::file("out");
        param.fill_from_string("/tmp/x.txt").unwrap();
        let config = config_with_output(Port::new("out", vec![]), param);

        let resolver = OutputResolver::default().with_converters(
            "out",
            ConverterChain::new().then(FnConverter(|mut u: Url| -> Result<Url> {
                u.set_query(Some("v=1"));
                Ok(u)
            })),
        );
        let payloads = resolver.resolve(&config).unwrap();
        assert_eq!(payloads[0].uris[0].query(), Some("v=1"));
        assert_eq!(payloads[0].mime, mime::TEXT_PLAIN);
    }

    #[test]
    fn test_prefix_port_collects_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("split");
        std::fs::write(&prefix, "").unwrap();
        std::fs::write(dir.path().join("split_2.csv"), "2").unwrap();
        std::fs::write(dir.path().join("split_1.csv"), "1").unwrap();
        std::fs::write(dir.path().join("other.csv"), "x").unwrap();

        let mut param = Parameter::file("out");
        param.fill_from_string(&prefix.to_string_lossy()).unwrap();
        let config = config_with_output(Port::new("out", vec![]).prefix(), param);

        let port = &config.output_ports()[0];
        let files = collect_files(&config, port).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("split_1.csv"), dir.path().join("split_2.csv")]
        );
    }
}
