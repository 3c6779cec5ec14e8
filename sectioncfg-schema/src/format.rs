//! Named value formats.
//!
//! Formats are registered by name (usually once, at process start) and
//! looked up by the validator whenever a descriptor carries
//! `format: "<name>"`. Two suffixes are understood without registration:
//! `<name>-list` checks every item of a `,; \t`-separated list and
//! `<name>-opt` additionally accepts the empty string.

use crate::error::FormatError;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

/// Format verifier: accepts the raw string or explains why not.
pub type FormatFn = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Format used for section ids and the `delete` update parameter.
pub const CONFIGID_FORMAT: &str = "pve-configid";

static CONFIGID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9_-]+$").expect("static regex"));

static LIST_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\s\x00]+").expect("static regex"));

/// Validates a section or property identifier.
pub fn verify_configid(value: &str) -> Result<(), String> {
    if CONFIGID_RE.is_match(value) {
        Ok(())
    } else {
        Err(format!("invalid configuration ID '{value}'"))
    }
}

/// Splits a `-list` formatted value into its non-empty items.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    LIST_SEPARATOR_RE.split(value).filter(|s| !s.is_empty())
}

#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, FormatFn>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.formats.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry").field("formats", &names).finish()
    }
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `pve-configid` format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .formats
            .insert(CONFIGID_FORMAT.to_string(), Arc::new(verify_configid));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, verify: F) -> Result<(), FormatError>
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(FormatError::InvalidName(name));
        }
        if self.formats.contains_key(&name) {
            return Err(FormatError::AlreadyRegistered(name));
        }
        tracing::debug!(format = %name, "Registered value format");
        self.formats.insert(name, Arc::new(verify));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<FormatFn> {
        self.formats.get(name).cloned()
    }

    /// Checks `value` against the format `name`, resolving `-list` and
    /// `-opt` suffixes when no format of that exact name exists.
    pub fn verify(&self, name: &str, value: &str) -> Result<(), String> {
        if let Some(verify) = self.formats.get(name) {
            return verify(value);
        }
        if let Some(base) = name.strip_suffix("-list") {
            let verify = self.lookup(base)?;
            for item in split_list(value) {
                verify(item)?;
            }
            return Ok(());
        }
        if let Some(base) = name.strip_suffix("-opt") {
            if value.is_empty() {
                return Ok(());
            }
            let verify = self.lookup(base)?;
            return verify(value);
        }
        Err(format!("unable to find format '{name}'"))
    }

    fn lookup(&self, name: &str) -> Result<&FormatFn, String> {
        self.formats
            .get(name)
            .ok_or_else(|| format!("unable to find format '{name}'"))
    }
}

static GLOBAL: OnceLock<RwLock<FormatRegistry>> = OnceLock::new();

/// The process-wide format registry, seeded with the built-in formats.
pub fn global() -> &'static RwLock<FormatRegistry> {
    GLOBAL.get_or_init(|| RwLock::new(FormatRegistry::with_defaults()))
}

/// Registers a format in the process-wide registry.
pub fn register_format<F>(name: impl Into<String>, verify: F) -> Result<(), FormatError>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
{
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, verify)
}

/// Snapshot of the process-wide registry.
pub fn global_snapshot() -> FormatRegistry {
    global().read().unwrap_or_else(PoisonError::into_inner).clone()
}
