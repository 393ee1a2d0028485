//! URI converters applied to produced files before they are published

use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::error::{Result, ToolEngineError};

/// Pure URI to URI transform
pub trait UriConverter: Send + Sync {
    fn convert(&self, uri: Url) -> Result<Url>;
}

/// Converter wrapping a closure
pub struct FnConverter<F>(pub F);

impl<F> UriConverter for FnConverter<F>
where
    F: Fn(Url) -> Result<Url> + Send + Sync,
{
    fn convert(&self, uri: Url) -> Result<Url> {
        (self.0)(uri)
    }
}

/// Moves URIs under one base onto another, e.g. a local job directory onto a
/// shared mount. URIs outside `from` pass through unchanged.
#[derive(Debug, Clone)]
pub struct RebaseConverter {
    from: Url,
    to: Url,
}

impl RebaseConverter {
    pub fn new(from: Url, to: Url) -> Self {
        Self {
            from: with_trailing_slash(from),
            to: with_trailing_slash(to),
        }
    }
}

impl UriConverter for RebaseConverter {
    fn convert(&self, uri: Url) -> Result<Url> {
        match uri.as_str().strip_prefix(self.from.as_str()) {
            Some(rest) => self
                .to
                .join(rest)
                .map_err(|e| ToolEngineError::Conversion(format!("{}: {}", uri, e))),
            None => Ok(uri),
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Ordered converters for one port, applied left to right
#[derive(Clone, Default)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn UriConverter>>,
}

impl ConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, converter: impl UriConverter + 'static) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn push(&mut self, converter: Arc<dyn UriConverter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn apply(&self, uri: Url) -> Result<Url> {
        self.converters
            .iter()
            .try_fold(uri, |uri, converter| converter.convert(uri))
    }
}

/// `file://` URI for an absolute path
pub fn file_uri(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|_| {
        ToolEngineError::Conversion(format!("'{}' is not an absolute path", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_chain_applies_left_to_right() {
        let chain = ConverterChain::new()
            .then(FnConverter(|mut u: Url| -> Result<Url> {
                u.set_path(&format!("{}.a", u.path()));
                Ok(u)
            }))
            .then(FnConverter(|mut u: Url| -> Result<Url> {
                u.set_path(&format!("{}.b", u.path()));
                Ok(u)
            }));

        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain.apply(url("file:///tmp/x")).unwrap().as_str(),
            "file:///tmp/x.a.b"
        );
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = ConverterChain::new();
        assert!(chain.is_empty());
        let u = url("file:///data/out.csv");
        assert_eq!(chain.apply(u.clone()).unwrap(), u);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let chain = ConverterChain::new()
            .then(FnConverter(|_u: Url| -> Result<Url> {
                Err(ToolEngineError::Conversion("nope".into()))
            }))
            .then(FnConverter(|_u: Url| -> Result<Url> { panic!("must not run") }));
        assert!(matches!(
            chain.apply(url("file:///x")),
            Err(ToolEngineError::Conversion(_))
        ));
    }

    #[test]
    fn test_rebase() {
        let rebase = RebaseConverter::new(
            url("file:///tmp/job"),
            url("https://files.example.org/shared"),
        );
        assert_eq!(
            rebase.convert(url("file:///tmp/job/out_1.csv")).unwrap().as_str(),
            "https://files.example.org/shared/out_1.csv"
        );
        assert_eq!(
            rebase.convert(url("file:///elsewhere/a.csv")).unwrap().as_str(),
            "file:///elsewhere/a.csv"
        );
    }

    #[test]
    fn test_file_uri_requires_absolute_path() {
        assert!(file_uri(Path::new("relative.csv")).is_err());
        let dir = std::env::temp_dir().join("out.csv");
        assert_eq!(file_uri(&dir).unwrap().scheme(), "file");
    }
}
