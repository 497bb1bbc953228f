use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

/// An untyped key-value mapping, as produced by adapters and the env resolver.
pub type RawMap = Map<String, Value>;

/// A concrete configuration source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A literal value, normally an object. Handed to the object adapter.
    Value(Value),
    /// A file on disk. The adapter is chosen from its suffix.
    Path(PathBuf),
}

impl Source {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Source::Path(p) => Some(p),
            Source::Value(_) => None,
        }
    }
}

impl From<RawMap> for Source {
    fn from(map: RawMap) -> Self {
        Source::Value(Value::Object(map))
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Value(value)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

type SourceFn = dyn Fn(&RawMap) -> Source + Send + Sync;

/// What the caller hands to `load`: a source, or a function choosing one
/// from the resolved environment overlay.
#[derive(Clone)]
pub enum SourceRef {
    Fixed(Source),
    Computed(Arc<SourceFn>),
}

impl SourceRef {
    /// Pick the source from a function of the validated env overlay, e.g. a
    /// file name keyed on an environment tag.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RawMap) -> Source + Send + Sync + 'static,
    {
        SourceRef::Computed(Arc::new(f))
    }

    pub fn resolve(&self, overlay: &RawMap) -> Source {
        match self {
            SourceRef::Fixed(source) => source.clone(),
            SourceRef::Computed(f) => f(overlay),
        }
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Fixed(source) => f.debug_tuple("Fixed").field(source).finish(),
            SourceRef::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Source> for SourceRef {
    fn from(source: Source) -> Self {
        SourceRef::Fixed(source)
    }
}

macro_rules! fixed_source_ref {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SourceRef {
                fn from(source: $ty) -> Self {
                    SourceRef::Fixed(Source::from(source))
                }
            }
        )*
    };
}

fixed_source_ref!(RawMap, Value, PathBuf, &Path, &str, String);

/// Text encoding used by the file adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl Encoding {
    pub fn decode(self, bytes: Vec<u8>) -> Result<String, String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| e.to_string()),
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}
