//! Plugin registration and the initialized [`SectionConfig`].

use crate::error::{RegistryError, Result};
use crate::merger::{MergedSchema, SchemaMerger};
use crate::plugin::{Fields, SectionPlugin, TypeOption};
use sectioncfg_schema::{
    ObjectSchema, PropertyDescriptor, PropertyMap, TYPE_PROPERTY, ValidationError, Validator,
    coerce, format,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError};
use tracing::{debug, info};

/// Options for [`PluginRegistry::init`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InitOptions {
    /// Keep type-specific properties separate per type in the schemas.
    #[serde(default)]
    pub isolate_properties: bool,
}

impl InitOptions {
    pub fn isolated() -> Self {
        Self {
            isolate_properties: true,
        }
    }
}

/// Properties and options a plugin declared, captured once at init.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginType {
    pub name: String,
    pub properties: PropertyMap,
    pub options: BTreeMap<String, TypeOption>,
}

/// A property after merging base and plugin declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedProperty {
    pub descriptor: PropertyDescriptor,
    /// Declared by the registry's base properties rather than a plugin.
    pub base: bool,
    /// Types whose `properties()` declared this property.
    pub definers: BTreeSet<String>,
}

/// Collects section plugins until [`init`](PluginRegistry::init).
pub struct PluginRegistry {
    base: PropertyMap,
    plugins: BTreeMap<String, Box<dyn SectionPlugin>>,
    config: Option<Arc<SectionConfig>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("base", &self.base.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("initialized", &self.config.is_some())
            .finish()
    }
}

impl PluginRegistry {
    /// Creates a registry with properties shared by every section type.
    /// A required `type` property is always added.
    pub fn new(base_properties: PropertyMap) -> Self {
        let mut base = base_properties;
        let type_descriptor = base
            .remove(TYPE_PROPERTY)
            .unwrap_or_else(|| PropertyDescriptor::string().with_description("Section type."))
            .required();
        base.insert(TYPE_PROPERTY.to_string(), type_descriptor);
        Self {
            base,
            plugins: BTreeMap::new(),
            config: None,
        }
    }

    pub fn register<P: SectionPlugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_boxed(Box::new(plugin))
    }

    pub fn register_boxed(&mut self, plugin: Box<dyn SectionPlugin>) -> Result<()> {
        if self.config.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }
        let name = plugin.type_name().to_string();
        if name.is_empty() || name.contains(|c: char| c == ':' || c.is_whitespace()) {
            return Err(RegistryError::InvalidTypeName(name));
        }
        if self.plugins.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }
        info!(section_type = %name, "Section plugin registered");
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Merges all registered plugins into a [`SectionConfig`].
    ///
    /// Runs once. Afterwards registration and re-init fail with
    /// [`RegistryError::AlreadyInitialized`].
    pub fn init(&mut self, options: InitOptions) -> Result<Arc<SectionConfig>> {
        if self.config.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let types: BTreeMap<String, PluginType> = self
            .plugins
            .iter()
            .map(|(name, plugin)| {
                let plugin_type = PluginType {
                    name: name.clone(),
                    properties: plugin.properties(),
                    options: plugin.options(),
                };
                (name.clone(), plugin_type)
            })
            .collect();

        let properties = merge_properties(&self.base, &types)?;
        for plugin_type in types.values() {
            if let Some(missing) = plugin_type.options.keys().find(|k| !properties.contains_key(*k)) {
                return Err(RegistryError::UnknownProperty {
                    section_type: plugin_type.name.clone(),
                    property: missing.clone(),
                });
            }
        }

        let isolated = options.isolate_properties;
        let schema = SchemaMerger::new(&properties, &types, isolated).merge();
        let effective_options = effective_options(&types, isolated);

        info!(
            types = types.len(),
            properties = properties.len(),
            isolated,
            "Section config initialized"
        );

        let config = Arc::new(SectionConfig {
            plugins: std::mem::take(&mut self.plugins),
            types,
            properties,
            effective_options,
            isolated,
            schema,
        });
        self.config = Some(Arc::clone(&config));
        Ok(config)
    }

    pub fn config(&self) -> Result<Arc<SectionConfig>> {
        self.config.clone().ok_or(RegistryError::NotInitialized)
    }
}

fn merge_properties(
    base: &PropertyMap,
    types: &BTreeMap<String, PluginType>,
) -> Result<BTreeMap<String, MergedProperty>> {
    let mut merged: BTreeMap<String, MergedProperty> = base
        .iter()
        .map(|(name, descriptor)| {
            let property = MergedProperty {
                descriptor: descriptor.clone(),
                base: true,
                definers: BTreeSet::new(),
            };
            (name.clone(), property)
        })
        .collect();

    for (type_name, plugin_type) in types {
        for (name, descriptor) in &plugin_type.properties {
            let descriptor = descriptor.clone().optional();
            match merged.get_mut(name) {
                None => {
                    merged.insert(
                        name.clone(),
                        MergedProperty {
                            descriptor,
                            base: false,
                            definers: BTreeSet::from([type_name.clone()]),
                        },
                    );
                }
                Some(existing) if existing.base => {
                    return Err(RegistryError::DuplicateProperty {
                        section_type: type_name.clone(),
                        property: name.clone(),
                    });
                }
                Some(existing) if existing.descriptor == descriptor => {
                    existing.definers.insert(type_name.clone());
                }
                Some(existing) => {
                    return Err(RegistryError::ConflictingProperty {
                        property: name.clone(),
                        first: existing.definers.first().cloned().unwrap_or_default(),
                        second: type_name.clone(),
                    });
                }
            }
        }
    }
    Ok(merged)
}

/// Options as seen by the codec. In isolated mode a type also uses every
/// property it declares, optionally unless its options say otherwise.
fn effective_options(
    types: &BTreeMap<String, PluginType>,
    isolated: bool,
) -> BTreeMap<String, BTreeMap<String, TypeOption>> {
    types
        .iter()
        .map(|(name, plugin_type)| {
            let mut options = plugin_type.options.clone();
            if isolated {
                for property in plugin_type.properties.keys() {
                    options.entry(property.clone()).or_insert_with(TypeOption::optional);
                }
            }
            (name.clone(), options)
        })
        .collect()
}

/// The immutable result of [`PluginRegistry::init`].
pub struct SectionConfig {
    plugins: BTreeMap<String, Box<dyn SectionPlugin>>,
    types: BTreeMap<String, PluginType>,
    properties: BTreeMap<String, MergedProperty>,
    effective_options: BTreeMap<String, BTreeMap<String, TypeOption>>,
    isolated: bool,
    schema: MergedSchema,
}

impl fmt::Debug for SectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionConfig")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("isolated", &self.isolated)
            .finish()
    }
}

impl SectionConfig {
    // ================================================================
    // Accessors
    // ================================================================

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn has_type(&self, section_type: &str) -> bool {
        self.types.contains_key(section_type)
    }

    pub fn plugin(&self, section_type: &str) -> Option<&dyn SectionPlugin> {
        self.plugins.get(section_type).map(Box::as_ref)
    }

    pub fn plugin_type(&self, section_type: &str) -> Option<&PluginType> {
        self.types.get(section_type)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name).map(|p| &p.descriptor)
    }

    pub fn merged_property(&self, name: &str) -> Option<&MergedProperty> {
        self.properties.get(name)
    }

    /// Options a type uses, including in isolated mode the properties it
    /// declares itself.
    pub fn options_for(&self, section_type: &str) -> Option<&BTreeMap<String, TypeOption>> {
        self.effective_options.get(section_type)
    }

    pub fn uses_property(&self, section_type: &str, key: &str) -> bool {
        self.options_for(section_type)
            .is_some_and(|options| options.contains_key(key))
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    pub fn create_schema(&self) -> &ObjectSchema {
        &self.schema.create
    }

    pub fn update_schema(&self) -> &ObjectSchema {
        &self.schema.update
    }

    // ================================================================
    // Value checks
    // ================================================================

    /// Checks a single value of a section and returns its decoded form.
    ///
    /// Textual values are coerced to the property kind after validation.
    /// A missing value is only accepted for booleans, where presence means
    /// `true`.
    pub fn check_value(
        &self,
        section_type: &str,
        key: &str,
        value: Option<&Value>,
    ) -> Result<Value, String> {
        if key == TYPE_PROPERTY {
            return match value {
                Some(Value::String(t)) if t == section_type => Ok(Value::String(t.clone())),
                _ => Err(format!("type mismatch, expected '{section_type}'")),
            };
        }
        let Some(plugin) = self.plugins.get(section_type) else {
            return Err(format!("unknown section type '{section_type}'"));
        };
        let descriptor = match self.property(key) {
            Some(descriptor) if self.uses_property(section_type, key) => descriptor,
            _ => return Err(format!("unexpected property '{key}'")),
        };

        let value = match value {
            Some(v) if !v.is_null() => v,
            _ if descriptor.is_boolean() => return plugin.decode_value(key, Value::Bool(true)),
            _ => return Err(format!("missing value for property '{key}'")),
        };
        if value.as_str() == Some("") {
            return Err(format!(
                "type check ('{}') failed - got empty value",
                descriptor.kind
            ));
        }

        let target = descriptor
            .items
            .as_deref()
            .filter(|_| !value.is_array())
            .unwrap_or(descriptor);
        {
            let formats = format::global().read().unwrap_or_else(PoisonError::into_inner);
            Validator::new(&formats)
                .check(value, target)
                .map_err(|e| e.to_string())?;
        }
        plugin.decode_value(key, coerce_value(value, target))
    }

    /// Record-level checks: required options on create, then the plugin's
    /// own `check_config` hook.
    pub fn verify_record(
        &self,
        section_type: &str,
        id: &str,
        fields: &Fields,
        create: bool,
    ) -> Result<(), ValidationError> {
        let (Some(plugin), Some(options)) =
            (self.plugins.get(section_type), self.options_for(section_type))
        else {
            return Err(ValidationError::at(
                TYPE_PROPERTY,
                format!("unknown section type '{section_type}'"),
            ));
        };

        let mut errors = ValidationError::new();
        if create {
            for (key, option) in options {
                if option.required && !fields.contains_key(key) {
                    errors.add(key.as_str(), format!("missing value for required option '{key}'"));
                }
            }
        }
        errors.into_result()?;

        plugin
            .check_config(id, fields, create)
            .map_err(ValidationError::single)
    }

    /// Checks the fields of a create or update request and returns the
    /// normalized field map, `type` included.
    ///
    /// Every invalid field is reported, not just the first one.
    pub fn check_config(
        &self,
        section_type: &str,
        id: &str,
        fields: &Fields,
        create: bool,
    ) -> Result<Fields, ValidationError> {
        let Some(options) = self.options_for(section_type) else {
            return Err(ValidationError::at(
                TYPE_PROPERTY,
                format!("unknown section type '{section_type}'"),
            ));
        };

        let mut errors = ValidationError::new();
        let mut settings = Fields::new();
        settings.insert(TYPE_PROPERTY.to_string(), Value::String(section_type.to_string()));

        for (key, value) in fields {
            if !create && options.get(key).is_some_and(|o| o.fixed) {
                errors.add(key.as_str(), format!("can't change value of fixed parameter '{key}'"));
                continue;
            }
            if value.is_null() {
                errors.add(key.as_str(), format!("got undefined value for option '{key}'"));
                continue;
            }
            match self.check_value(section_type, key, Some(value)) {
                Ok(value) => {
                    settings.insert(key.clone(), value);
                }
                Err(message) => errors.add(key.as_str(), message),
            }
        }
        errors.into_result()?;

        self.verify_record(section_type, id, &settings, create)?;
        debug!(section_type, id, create, "section config checked");
        Ok(settings)
    }
}

fn coerce_value(value: &Value, descriptor: &PropertyDescriptor) -> Value {
    match (value, descriptor.items.as_deref()) {
        (Value::String(text), _) => coerce(text, descriptor),
        (Value::Number(n), _) if descriptor.is_boolean() => Value::Bool(n.as_u64() == Some(1)),
        (Value::Array(items), Some(item)) => {
            Value::Array(items.iter().map(|v| coerce_value(v, item)).collect())
        }
        _ => value.clone(),
    }
}
