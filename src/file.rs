//! Reading and decoding config files.
//!
//! Every file adapter does the same two steps: read the bytes under an
//! [`Encoding`], then decode the text with a format-specific parser. Any read
//! error (missing file, permissions, I/O) becomes
//! [`ReadFailure`](SchemafigError::ReadFailure); any decode error, including a
//! top-level document that is not a mapping, becomes
//! [`ParseFailure`](SchemafigError::ParseFailure).

use std::path::Path;

use serde_json::Value;

use crate::error::SchemafigError;
use crate::types::{Encoding, RawMap};

/// A supported file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    #[cfg(feature = "yaml")]
    Yaml,
    #[cfg(feature = "toml")]
    Toml,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            #[cfg(feature = "yaml")]
            Format::Yaml => "yaml",
            #[cfg(feature = "toml")]
            Format::Toml => "toml",
        }
    }

    /// The format whose suffix `name` ends with (`.json`, `.yaml`, `.yml`,
    /// `.toml`). Matching is case-sensitive.
    pub fn from_suffix(name: &str) -> Option<Format> {
        if name.ends_with(".json") {
            return Some(Format::Json);
        }
        #[cfg(feature = "yaml")]
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            return Some(Format::Yaml);
        }
        #[cfg(feature = "toml")]
        if name.ends_with(".toml") {
            return Some(Format::Toml);
        }
        None
    }

    /// Decode `text` into a mapping.
    pub fn decode(self, text: &str, path: &Path) -> Result<RawMap, SchemafigError> {
        let parse_failure = |reason: String| SchemafigError::ParseFailure {
            path: path.to_path_buf(),
            format: self.name(),
            reason,
        };

        let value: Value = match self {
            Format::Json => serde_json::from_str(text).map_err(|e| parse_failure(e.to_string()))?,
            #[cfg(feature = "yaml")]
            Format::Yaml => {
                match serde_yaml::from_str(text).map_err(|e| parse_failure(e.to_string()))? {
                    // An empty YAML document is an empty mapping.
                    Value::Null => Value::Object(RawMap::new()),
                    other => other,
                }
            }
            #[cfg(feature = "toml")]
            Format::Toml => toml::from_str(text).map_err(|e| parse_failure(e.to_string()))?,
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(parse_failure("top-level document is not a mapping".into())),
        }
    }
}

fn read_failure(path: &Path, source: std::io::Error) -> SchemafigError {
    SchemafigError::ReadFailure {
        path: path.to_path_buf(),
        source,
    }
}

fn decode_text(
    bytes: Vec<u8>,
    encoding: Encoding,
    format: Format,
    path: &Path,
) -> Result<String, SchemafigError> {
    encoding
        .decode(bytes)
        .map_err(|reason| SchemafigError::ParseFailure {
            path: path.to_path_buf(),
            format: format.name(),
            reason,
        })
}

/// Read and decode a file, blocking the calling thread.
pub fn load_file_sync(
    path: &Path,
    encoding: Encoding,
    format: Format,
) -> Result<RawMap, SchemafigError> {
    let bytes = std::fs::read(path).map_err(|e| read_failure(path, e))?;
    let text = decode_text(bytes, encoding, format, path)?;
    format.decode(&text, path)
}

/// Read and decode a file without blocking the runtime.
pub async fn load_file(
    path: &Path,
    encoding: Encoding,
    format: Format,
) -> Result<RawMap, SchemafigError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| read_failure(path, e))?;
    let text = decode_text(bytes, encoding, format, path)?;
    format.decode(&text, path)
}
