//! Error types for the elfsift analysis engine.
//!
//! Codec failures live in [`ElfError`]; this module wraps them together with
//! the I/O, configuration and collaborator failures of a full analysis run.

use crate::formats::elf::ElfError;
use thiserror::Error;

/// Main error type for elfsift operations.
#[derive(Debug, Error)]
pub enum ElfSiftError {
    /// The file header is not a usable ELF header
    #[error("Invalid ELF format: {0}")]
    InvalidFormat(#[from] ElfError),

    /// The name filter regex failed to compile
    #[error("Invalid filter pattern {pattern:?}: {message}")]
    InvalidFilter { pattern: String, message: String },

    /// Bounded operation ran out of time
    #[error("Operation timeout after {millis}ms")]
    Timeout { millis: u64 },

    /// Input exceeds the configured size limit
    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { limit: u64, found: u64 },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External helper process failed
    #[error("External tool error: {0}")]
    ExternalTool(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Report rendering errors
    #[error("Render error: {0}")]
    Render(String),
}

impl From<serde_json::Error> for ElfSiftError {
    fn from(err: serde_json::Error) -> Self {
        ElfSiftError::Serialization(err.to_string())
    }
}

/// Result type alias for elfsift operations
pub type Result<T> = std::result::Result<T, ElfSiftError>;
