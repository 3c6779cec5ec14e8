//! Commands behind the `sectioncfg` binary, kept out of `main` so they can
//! be tested without spawning a process.

use anyhow::{Context, Result};
use sectioncfg_document::{DocumentCodec, ParseWarning};
use sectioncfg_registry::{DefinitionFile, InitOptions, SectionConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loads plugin definitions and initializes a section config from them.
pub fn load_config(plugins: &Path, options: InitOptions) -> Result<Arc<SectionConfig>> {
    let definitions = DefinitionFile::load(plugins)
        .with_context(|| format!("Failed to load plugin definitions from {}", plugins.display()))?;
    let mut registry = definitions
        .into_registry()
        .context("Invalid plugin definitions")?;
    let config = registry
        .init(options)
        .context("Failed to initialize section config")?;
    info!("Loaded {} section types from {}", config.types().count(), plugins.display());
    Ok(config)
}

/// The create or update schema as pretty-printed JSON.
pub fn schema_json(config: &SectionConfig, update: bool) -> Result<String> {
    let schema = if update {
        config.update_schema()
    } else {
        config.create_schema()
    };
    serde_json::to_string_pretty(schema).context("Failed to serialize schema")
}

/// Result of checking one config file.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub sections: usize,
    pub warnings: Vec<ParseWarning>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn check_text(codec: &DocumentCodec, text: &str) -> CheckReport {
    let document = codec.parse(text);
    CheckReport {
        sections: document.len(),
        warnings: document.warnings().to_vec(),
    }
}

/// Parses and rewrites `text` in canonical form.
pub fn format_text(codec: &DocumentCodec, text: &str) -> Result<String> {
    let document = codec.parse(text);
    codec.write(&document).context("Failed to write normalized config")
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
