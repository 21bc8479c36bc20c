//! Error types for stack definition and synthesis

use thiserror::Error;

/// Main error type for Strata operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Validation error for stack configuration or resource specs
    #[error("validation error: {0}")]
    Validation(String),

    /// A declaration referenced a resource that was never declared,
    /// or was declared after its dependent
    #[error("reference error: {0}")]
    Reference(String),

    /// Template synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Configuration file error
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a reference error with the given message
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    /// Create a synthesis error with the given message
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
