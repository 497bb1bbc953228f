//! Source adapters: turn a [`Source`] into a raw mapping.
//!
//! An adapter has a blocking and a non-blocking entry point. The engine picks
//! one automatically from the source unless one was assigned explicitly:
//!
//! | Source                          | Adapter                  |
//! |---------------------------------|--------------------------|
//! | `Source::Value(_)`              | [`ObjectAdapter`]        |
//! | path ending in `.json`          | [`FileAdapter::json`]    |
//! | path ending in `.yaml` / `.yml` | [`FileAdapter::yaml`]    |
//! | path ending in `.toml`          | [`FileAdapter::toml`]    |
//! | any other path                  | none (`AdapterNotSet`)   |

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SchemafigError;
use crate::file::{self, Format};
use crate::types::{Encoding, RawMap, Source};

/// A pluggable source-reading strategy.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn load(&self, source: &Source) -> Result<RawMap, SchemafigError>;

    fn load_sync(&self, source: &Source) -> Result<RawMap, SchemafigError>;
}

impl fmt::Debug for dyn Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Adapter({})", self.name())
    }
}

/// Passes a literal object through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectAdapter;

impl ObjectAdapter {
    fn extract(&self, source: &Source) -> Result<RawMap, SchemafigError> {
        match source {
            Source::Value(Value::Object(map)) => Ok(map.clone()),
            _ => Err(SchemafigError::AdapterMismatch {
                adapter: self.name().to_string(),
                expected: "an object",
            }),
        }
    }
}

#[async_trait]
impl Adapter for ObjectAdapter {
    fn name(&self) -> &str {
        "object"
    }

    async fn load(&self, source: &Source) -> Result<RawMap, SchemafigError> {
        self.extract(source)
    }

    fn load_sync(&self, source: &Source) -> Result<RawMap, SchemafigError> {
        self.extract(source)
    }
}

/// Reads a file from disk and decodes it in one [`Format`].
#[derive(Debug, Clone, Copy)]
pub struct FileAdapter {
    format: Format,
    encoding: Encoding,
}

impl FileAdapter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            encoding: Encoding::default(),
        }
    }

    pub fn json() -> Self {
        Self::new(Format::Json)
    }

    #[cfg(feature = "yaml")]
    pub fn yaml() -> Self {
        Self::new(Format::Yaml)
    }

    #[cfg(feature = "toml")]
    pub fn toml() -> Self {
        Self::new(Format::Toml)
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn path<'a>(&self, source: &'a Source) -> Result<&'a std::path::Path, SchemafigError> {
        source
            .as_path()
            .ok_or_else(|| SchemafigError::AdapterMismatch {
                adapter: self.format.name().to_string(),
                expected: "a file path",
            })
    }
}

#[async_trait]
impl Adapter for FileAdapter {
    fn name(&self) -> &str {
        self.format.name()
    }

    async fn load(&self, source: &Source) -> Result<RawMap, SchemafigError> {
        let path = self.path(source)?;
        file::load_file(path, self.encoding, self.format).await
    }

    fn load_sync(&self, source: &Source) -> Result<RawMap, SchemafigError> {
        let path = self.path(source)?;
        file::load_file_sync(path, self.encoding, self.format)
    }
}

/// Pick an adapter for `source`, or `None` if the path has no known suffix.
pub fn select(source: &Source) -> Option<Arc<dyn Adapter>> {
    match source {
        Source::Value(_) => Some(Arc::new(ObjectAdapter)),
        Source::Path(path) => {
            let format = Format::from_suffix(path.to_str()?)?;
            Some(Arc::new(FileAdapter::new(format)))
        }
    }
}
