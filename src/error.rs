use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the file and codec surfaces around the inventory core.
///
/// Slot-level operations never produce these; they report through sentinel
/// slot ids and booleans instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml failure in {context}: {source}")]
    Yaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error("item definition {0} already exists")]
    DuplicateDefinition(u32),

    #[error("unknown item definition {0}")]
    UnknownDefinition(u32),

    #[error("record data truncated while reading {0}")]
    Truncated(&'static str),

    #[error("invalid slot {0}")]
    InvalidSlot(i16),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn yaml(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        StoreError::Yaml {
            context: context.into(),
            source,
        }
    }
}
