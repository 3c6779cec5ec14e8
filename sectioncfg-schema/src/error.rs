//! Error types for schema validation.

use std::collections::BTreeMap;
use thiserror::Error;

/// Aggregate of every violation found while checking a value, keyed by
/// property path. A single-value check uses the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", render(.errors))]
pub struct ValidationError {
    errors: BTreeMap<String, String>,
}

fn render(errors: &BTreeMap<String, String>) -> String {
    if errors.is_empty() {
        return "validation failed".to_string();
    }
    errors
        .iter()
        .map(|(path, msg)| {
            if path.is_empty() {
                msg.clone()
            } else {
                format!("{path}: {msg}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// An error for a single value (empty path).
    pub fn single(message: impl Into<String>) -> Self {
        Self::at("", message)
    }

    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(path, message);
        err
    }

    /// Records a violation. The first message for a path wins.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(path.into()).or_insert_with(|| message.into());
    }

    /// Moves every entry of `other` under `prefix`.
    pub fn merge_under(&mut self, prefix: &str, other: ValidationError) {
        for (path, msg) in other.errors {
            self.add(join_path(prefix, &path), msg);
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{key}"),
    }
}

/// Errors raised when registering value formats.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("invalid format name: {0:?}")]
    InvalidName(String),
}
