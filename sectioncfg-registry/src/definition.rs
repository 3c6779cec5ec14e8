//! Declarative section types, described in TOML instead of code.
//!
//! ```toml
//! [base.comment]
//! type = "string"
//! optional = true
//!
//! [[plugin]]
//! type = "dir"
//!
//! [plugin.properties.path]
//! type = "string"
//!
//! [plugin.options.path]
//! required = true
//! fixed = true
//!
//! [plugin.options.comment]
//! ```

use crate::error::Result;
use crate::plugin::{SectionPlugin, TypeOption};
use crate::registry::PluginRegistry;
use sectioncfg_schema::PropertyMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A section type with no custom hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinition {
    #[serde(rename = "type")]
    pub section_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub options: BTreeMap<String, TypeOption>,
}

impl PluginDefinition {
    pub fn new(section_type: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            properties: PropertyMap::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        descriptor: sectioncfg_schema::PropertyDescriptor,
    ) -> Self {
        self.properties.insert(name.into(), descriptor);
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, option: TypeOption) -> Self {
        self.options.insert(name.into(), option);
        self
    }
}

impl SectionPlugin for PluginDefinition {
    fn type_name(&self) -> &str {
        &self.section_type
    }

    fn properties(&self) -> PropertyMap {
        self.properties.clone()
    }

    fn options(&self) -> BTreeMap<String, TypeOption> {
        self.options.clone()
    }
}

/// Base properties plus plugin definitions, as stored in a definitions file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub base: PropertyMap,
    #[serde(default, rename = "plugin")]
    pub plugins: Vec<PluginDefinition>,
}

impl DefinitionFile {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads a definitions file. Unlike settings, a broken definitions file
    /// is an error: there is no sensible set of default types.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), plugins = file.plugins.len(), "Loaded plugin definitions");
        Ok(file)
    }

    /// Registers every definition in a new registry. The registry is not
    /// initialized yet, so code-defined plugins can still be added.
    pub fn into_registry(self) -> Result<PluginRegistry> {
        let mut registry = PluginRegistry::new(self.base);
        for plugin in self.plugins {
            registry.register(plugin)?;
        }
        Ok(registry)
    }
}
