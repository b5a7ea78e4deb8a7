use std::fmt::{Display, Formatter, Result as FmtResult};

/// Errors returned by the cache façade's boundary operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Returned by `Add` when the key is already present.
    AlreadyExists(String),
    /// Returned by `Replace` when the key is absent.
    Missing(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CacheError::AlreadyExists(key) => write!(f, "key '{key}' already exists"),
            CacheError::Missing(key) => write!(f, "key '{key}' doesn't exist"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Errors returned by constructors that validate their arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A non-positive tick interval, slot count, or shard count was given.
    InvalidArgument(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConfigError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
