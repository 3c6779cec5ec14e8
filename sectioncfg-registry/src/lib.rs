//! Section type registry for sectioncfg.
//!
//! Section types are registered as [`SectionPlugin`]s, either in code or as
//! declarative [`PluginDefinition`]s. [`PluginRegistry::init`] merges their
//! properties with the base properties into an immutable [`SectionConfig`]
//! holding the create and update schemas and the per-value checks used by
//! the document codec.

mod definition;
mod error;
mod merger;
mod plugin;
mod registry;

pub use definition::{DefinitionFile, PluginDefinition};
pub use error::{RegistryError, Result};
pub use merger::{DELETE_PROPERTY, DIGEST_PROPERTY, MergedSchema};
pub use plugin::{Fields, SectionPlugin, TypeOption};
pub use registry::{InitOptions, MergedProperty, PluginRegistry, PluginType, SectionConfig};
