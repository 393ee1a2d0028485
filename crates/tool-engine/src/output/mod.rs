//! Output resolution: MIME lookup, URI converters and payload construction

mod converter;
mod mime_registry;
mod resolver;

pub use self::converter::{file_uri, ConverterChain, FnConverter, RebaseConverter, UriConverter};
pub use self::mime_registry::MimeRegistry;
pub use self::resolver::{collect_files, OutputPayload, OutputResolver};
