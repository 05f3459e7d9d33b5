//! Error types for fctc-core

use fctc_oracle::OracleError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for populator operations
pub type Result<T> = std::result::Result<T, FctcError>;

/// Main error type for populator operations
#[derive(Error, Debug)]
pub enum FctcError {
    /// The oracle could not answer
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Oracle text did not have the required shape
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Query cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Item graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The item graph holds items from an unfinished run
    #[error("Item graph contains {} incomplete items; rebuild or ignore corruption to continue", .names.len())]
    Corrupted { names: Vec<String> },

    /// A cancellation request was honored at a checkpoint
    #[error("Run cancelled")]
    Cancelled,

    /// Internal invariant violated
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Oracle text that does not match the expected format
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A line of an ordered list was malformed
    #[error("Invalid ordered list line '{line}': {reason}")]
    OrderedList { line: String, reason: String },

    /// A year expression could not be parsed
    #[error("Invalid year format: '{0}'")]
    Year(String),
}

/// Query cache errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// No item has ever been asked this list query
    #[error("Unknown query string: '{0}'")]
    UnknownQuery(String),

    /// Knowledge-base key does not exist
    #[error("Unknown knowledge-base key: '{0}'")]
    UnknownKnowledgeKey(String),
}

/// Item graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Database file missing and creation was not requested
    #[error("Database file {0} does not exist")]
    MissingDatabase(String),

    /// The persisted graph is not a JSON object keyed by item name
    #[error("Malformed item graph: {0}")]
    Malformed(String),

    /// Status change the item lifecycle does not allow
    #[error("Invalid status transition for {item}: {from} -> {to}")]
    InvalidTransition { item: String, from: String, to: String },
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for FctcError {
    fn from(err: serde_json::Error) -> Self {
        FctcError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}

impl From<std::io::Error> for FctcError {
    fn from(err: std::io::Error) -> Self {
        FctcError::Persistence(PersistenceError::Io(err.to_string()))
    }
}

impl FctcError {
    /// Whether this error ends a run because of a cancellation request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FctcError::Cancelled)
    }
}
