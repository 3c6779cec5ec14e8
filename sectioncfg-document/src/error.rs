//! Error types for the document codec.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

/// Why a document could not be written. Any of these aborts the whole
/// write; no partial output is returned.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("section '{id}' - missing value for required option '{key}'")]
    MissingRequired { id: String, key: String },

    #[error("section '{id}' - unknown section type '{section_type}'")]
    UnknownType { id: String, section_type: String },

    #[error("section '{id}' - property '{key}' contains a line break")]
    LineBreak { id: String, key: String },

    #[error("section '{id}' - invalid section header: {message}")]
    InvalidHeader { id: String, message: String },

    #[error("section '{id}' - unable to encode value of '{key}': {message}")]
    Encode {
        id: String,
        key: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("detected modified configuration - file changed by other user? Try again.")]
    DigestMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

/// A problem found while parsing. Parsing never fails; it drops what it
/// cannot use and records why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    pub section: Option<String>,
    pub key: Option<String>,
    pub message: String,
}

impl ParseWarning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            section: None,
            key: None,
            message: message.into(),
        }
    }

    pub fn in_section(mut self, id: impl Into<String>) -> Self {
        self.section = Some(id.into());
        self
    }

    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)?;
        if let Some(section) = &self.section {
            write!(f, " (section '{section}')")?;
        }
        write!(f, ": {}", self.message)
    }
}
