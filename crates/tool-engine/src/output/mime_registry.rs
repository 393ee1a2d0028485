//! File extension to MIME type registry

use mime::Mime;

use crate::error::{Result, ToolEngineError};

/// Registered extension table; lookups never fall back to a default type
#[derive(Debug, Clone)]
pub struct MimeRegistry {
    /// Lowercase extension without leading dot, e.g. `csv` or `fastq.gz`
    entries: Vec<(String, Mime)>,
}

impl Default for MimeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MimeRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A registry preloaded with common tabular, text and image formats
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("csv", mime::TEXT_CSV);
        registry.register("tsv", mime::TEXT_TAB_SEPARATED_VALUES);
        registry.register("tab", mime::TEXT_TAB_SEPARATED_VALUES);
        registry.register("txt", mime::TEXT_PLAIN);
        registry.register("log", mime::TEXT_PLAIN);
        registry.register("xml", mime::TEXT_XML);
        registry.register("html", mime::TEXT_HTML);
        registry.register("json", mime::APPLICATION_JSON);
        registry.register("pdf", mime::APPLICATION_PDF);
        registry.register("png", mime::IMAGE_PNG);
        registry.register("jpg", mime::IMAGE_JPEG);
        registry.register("jpeg", mime::IMAGE_JPEG);
        registry.register("gif", mime::IMAGE_GIF);
        registry.register("svg", mime::IMAGE_SVG);
        registry.register("bin", mime::APPLICATION_OCTET_STREAM);
        registry
    }

    /// Register (or replace) the MIME type for an extension
    pub fn register(&mut self, extension: &str, mime: Mime) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        match self.entries.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = mime,
            None => self.entries.push((extension, mime)),
        }
    }

    /// MIME type of `file_name`, matching the longest registered extension
    pub fn lookup(&self, file_name: &str) -> Option<&Mime> {
        let lower = file_name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(ext, _)| {
                lower.len() > ext.len()
                    && lower.ends_with(ext.as_str())
                    && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
            })
            .max_by_key(|(ext, _)| ext.len())
            .map(|(_, mime)| mime)
    }

    /// Like [`lookup`](Self::lookup) but an unregistered extension is an error
    pub fn resolve(&self, file_name: &str) -> Result<Mime> {
        self.lookup(file_name)
            .cloned()
            .ok_or_else(|| ToolEngineError::NonExistingMimeType(file_name.to_string()))
    }

    /// First extension registered for `mime`
    pub fn extension_for(&self, mime: &Mime) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, m)| m == mime)
            .map(|(ext, _)| ext.as_str())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup() {
        let registry = MimeRegistry::with_defaults();
        assert_eq!(registry.lookup("out.csv"), Some(&mime::TEXT_CSV));
        assert_eq!(registry.lookup("OUT.CSV"), Some(&mime::TEXT_CSV));
        assert_eq!(registry.lookup("/tmp/a.b/plot.png"), Some(&mime::IMAGE_PNG));
        assert_eq!(registry.lookup("csv"), None);
        assert_eq!(registry.lookup("file.xcsv"), None);
    }

    #[test]
    fn test_longest_extension_wins() {
        let mut registry = MimeRegistry::new();
        registry.register("gz", "application/gzip".parse().unwrap());
        registry.register(".tsv.gz", "application/x-tsv-gz".parse().unwrap());

        assert_eq!(
            registry.lookup("table.tsv.gz").map(|m| m.essence_str()),
            Some("application/x-tsv-gz")
        );
        assert_eq!(
            registry.lookup("table.gz").map(|m| m.essence_str()),
            Some("application/gzip")
        );
    }

    #[test]
    fn test_unregistered_is_error() {
        let registry = MimeRegistry::with_defaults();
        let err = registry.resolve("reads.fastq").unwrap_err();
        assert!(matches!(err, ToolEngineError::NonExistingMimeType(name) if name == "reads.fastq"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = MimeRegistry::new();
        registry.register("dat", mime::TEXT_PLAIN);
        registry.register("DAT", mime::APPLICATION_OCTET_STREAM);
        assert_eq!(registry.extensions().count(), 1);
        assert_eq!(registry.resolve("x.dat").unwrap(), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(registry.extension_for(&mime::APPLICATION_OCTET_STREAM), Some("dat"));
    }
}
