//! Settings file, `sectioncfg.toml`.
//!
//! ```toml
//! [schema]
//! isolate-properties = true
//!
//! [parser]
//! allow-unknown = false
//! ```

use crate::error::Result;
use sectioncfg_registry::InitOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParserSettings {
    /// Keep sections of unknown types and unused options instead of
    /// dropping them.
    #[serde(default)]
    pub allow_unknown: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub schema: InitOptions,
    #[serde(default)]
    pub parser: ParserSettings,
}

impl Settings {
    /// Strict variant: a parse problem is an error.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Strict file variant: a missing or unreadable file is an error too.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads settings from `path`, falling back to defaults if the file is
    /// missing or broken.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::read_from(path) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("Failed to load settings file {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }
}
