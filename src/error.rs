use serde::{Deserialize, Serialize};
use thiserror::Error;

use serde_json::Error as JsonError;

/// Failures raised by the node stack itself, independent of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ImportError {
    #[error("Node needs to have a name")]
    MissingName,
    #[error("Cannot finish node: only the import anchor remains on the stack")]
    StackUnderflow,
}

/// Failures surfaced from a [crate::store::ContentStore] implementation. These are passed through
/// the loader unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    ItemExists(String),
    #[error("Capability rejected: {0}")]
    NoSuchCapability(String),
    #[error("Property type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum LoaderError {
    #[error("Invalid path: {0}")]
    Path(String),
    #[error("Import error: {0}")]
    Import(#[from] ImportError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid property value: {0}")]
    Value(String),
    #[error("Import provider error: {0}")]
    Provider(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for LoaderError {
    fn from(src: toml::de::Error) -> LoaderError {
        LoaderError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for LoaderError {
    fn from(src: JsonError) -> LoaderError {
        LoaderError::Provider(format!("JSON deserialization error: {src}"))
    }
}

impl From<uuid::Error> for LoaderError {
    fn from(src: uuid::Error) -> LoaderError {
        LoaderError::Value(format!("UUID conversion failed: {src}"))
    }
}

impl From<std::num::ParseIntError> for LoaderError {
    fn from(src: std::num::ParseIntError) -> LoaderError {
        LoaderError::Value(format!("Integer conversion failed: {src}"))
    }
}

impl From<std::num::ParseFloatError> for LoaderError {
    fn from(src: std::num::ParseFloatError) -> LoaderError {
        LoaderError::Value(format!("Float conversion failed: {src}"))
    }
}

impl From<chrono::ParseError> for LoaderError {
    fn from(src: chrono::ParseError) -> LoaderError {
        LoaderError::Value(format!("Date conversion failed: {src}"))
    }
}
