use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by change listeners.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SchemafigError {
    #[error("Configuration not loaded — call .load() or .load_sync() first")]
    NotLoaded,

    #[error("No adapter set — assign one with .set_adapter() or use a .json/.yaml/.yml/.toml path")]
    AdapterNotSet,

    #[error("The {adapter} adapter expects {expected}")]
    AdapterMismatch {
        adapter: String,
        expected: &'static str,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path} as {format}: {reason}")]
    ParseFailure {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("No source stored — load at least once before reloading")]
    NoSource,

    #[error("Field '{field}' could not be converted: {source}")]
    Serde {
        field: String,
        source: serde_json::Error,
    },

    #[error("Listener for '{field}' failed: {source}")]
    Listener { field: String, source: ListenerError },

    #[error("Reload interval requires a running tokio runtime")]
    NoRuntime,

    #[error("No schema set — call .schema() or .schema_fn() on the builder")]
    SchemaRequired,
}

/// One offending field inside a [`ValidationFailure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// Every field that failed validation during a single load, overlay, or set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn single(field: &str, reason: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                field: field.to_string(),
                reason: reason.into(),
            }],
        }
    }

    /// True if `field` is among the offending fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "'{}': {}", issue.field, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}
