//! The plugin trait implemented by every section type.

use sectioncfg_schema::PropertyMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Typed property values of one section, keyed by property name.
pub type Fields = BTreeMap<String, Value>;

/// How a section type uses a property.
///
/// `fixed` properties may be set when a section is created but never
/// changed afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOption {
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fixed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TypeOption {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            fixed: false,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// A section type.
///
/// Only [`type_name`](SectionPlugin::type_name) is mandatory. Everything else
/// has a default that declares nothing and passes values through unchanged.
/// The registry reads `properties()` and `options()` exactly once, during
/// [`PluginRegistry::init`](crate::PluginRegistry::init).
pub trait SectionPlugin: Send + Sync {
    /// The section type name written in `type: id` headers.
    fn type_name(&self) -> &str;

    /// Properties this type contributes beyond the base properties.
    fn properties(&self) -> PropertyMap {
        PropertyMap::new()
    }

    /// Properties this type uses, with their required/fixed flags.
    fn options(&self) -> BTreeMap<String, TypeOption> {
        BTreeMap::new()
    }

    /// Converts a checked value into its in-memory form.
    fn decode_value(&self, key: &str, value: Value) -> Result<Value, String> {
        let _ = key;
        Ok(value)
    }

    /// Converts an in-memory value back to the form written to disk.
    fn encode_value(&self, key: &str, value: &Value) -> Result<Value, String> {
        let _ = key;
        Ok(value.clone())
    }

    /// Cross-field checks on an assembled record.
    /// Return `Err(message)` to reject it.
    fn check_config(&self, id: &str, fields: &Fields, create: bool) -> Result<(), String> {
        let _ = (id, fields, create);
        Ok(())
    }
}
