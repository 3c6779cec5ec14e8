//! Builds the create and update schemas from the registered types.
//!
//! For every property the merger computes who declares it, who uses it,
//! who requires it and who fixes it, then picks a [`PropertyShape`]:
//!
//! - unified mode keeps one descriptor per property and only adjusts
//!   requiredness;
//! - isolated mode limits type-specific properties to their types
//!   (`instance-types`) and splits base properties whose requiredness
//!   differs per type into one branch per type (`oneOf`).

use crate::registry::{MergedProperty, PluginType};
use sectioncfg_schema::{Branch, ObjectSchema, PropertyDescriptor, PropertyShape, TYPE_PROPERTY};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Property carrying the config digest in update requests.
pub const DIGEST_PROPERTY: &str = "digest";
/// Property listing the settings to delete in update requests.
pub const DELETE_PROPERTY: &str = "delete";

/// Create and update schemas, computed once at init.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSchema {
    pub create: ObjectSchema,
    pub update: ObjectSchema,
}

/// Usage of one property across all section types.
#[derive(Debug, Default)]
struct Usage<'a> {
    /// Types that declare the property or list it in their options.
    applicable: BTreeSet<&'a str>,
    using: BTreeSet<&'a str>,
    required: BTreeSet<&'a str>,
    fixed_by: BTreeSet<&'a str>,
}

pub(crate) struct SchemaMerger<'a> {
    properties: &'a BTreeMap<String, MergedProperty>,
    types: &'a BTreeMap<String, PluginType>,
    all: BTreeSet<&'a str>,
    isolated: bool,
}

impl<'a> SchemaMerger<'a> {
    pub(crate) fn new(
        properties: &'a BTreeMap<String, MergedProperty>,
        types: &'a BTreeMap<String, PluginType>,
        isolated: bool,
    ) -> Self {
        Self {
            properties,
            types,
            all: types.keys().map(String::as_str).collect(),
            isolated,
        }
    }

    pub(crate) fn merge(&self) -> MergedSchema {
        MergedSchema {
            create: self.create_schema(),
            update: self.update_schema(),
        }
    }

    fn usage(&self, name: &str, property: &'a MergedProperty) -> Usage<'a> {
        let mut usage = Usage::default();
        usage.applicable.extend(property.definers.iter().map(String::as_str));
        for (type_name, plugin_type) in self.types {
            let Some(option) = plugin_type.options.get(name) else {
                continue;
            };
            let type_name = type_name.as_str();
            usage.applicable.insert(type_name);
            usage.using.insert(type_name);
            if option.required {
                usage.required.insert(type_name);
            }
            if option.fixed {
                usage.fixed_by.insert(type_name);
            }
        }
        usage
    }

    fn applies_to_all(&self, usage: &Usage<'_>) -> bool {
        usage.applicable.is_empty() || usage.applicable == self.all
    }

    fn type_descriptor(&self) -> PropertyDescriptor {
        self.properties
            .get(TYPE_PROPERTY)
            .map(|p| p.descriptor.clone())
            .unwrap_or_else(PropertyDescriptor::string)
            .required()
            .with_enum(self.all.iter().copied())
    }

    fn create_schema(&self) -> ObjectSchema {
        let mut schema = ObjectSchema::new();
        for (name, property) in self.properties {
            if name == TYPE_PROPERTY {
                continue;
            }
            let usage = self.usage(name, property);
            let shape = if self.isolated {
                self.isolated_create(property, &usage)
            } else {
                unified_create(property, &usage)
            };
            debug!(property = %name, shape = shape_name(&shape), "merged create property");
            schema.insert(name.as_str(), shape);
        }
        schema.insert(TYPE_PROPERTY, PropertyShape::Uniform(self.type_descriptor()));
        schema
    }

    fn isolated_create(&self, property: &MergedProperty, usage: &Usage<'_>) -> PropertyShape {
        if !self.applies_to_all(usage) {
            return PropertyShape::Restricted {
                types: usage.applicable.iter().map(|t| t.to_string()).collect(),
                descriptor: property.descriptor.clone().optional(),
            };
        }
        let split = property.base
            && !property.descriptor.optional
            && !usage.required.is_empty()
            && usage.required.len() < self.all.len();
        if !split {
            return unified_create(property, usage);
        }
        let branches = usage
            .using
            .iter()
            .map(|t| {
                let mut descriptor = property.descriptor.clone();
                descriptor.optional = !usage.required.contains(t);
                Branch {
                    section_type: t.to_string(),
                    descriptor,
                }
            })
            .collect();
        PropertyShape::Discriminated { branches }
    }

    fn update_schema(&self) -> ObjectSchema {
        let mut schema = ObjectSchema::new();
        for (name, property) in self.properties {
            if name == TYPE_PROPERTY {
                continue;
            }
            let usage = self.usage(name, property);
            let shape = if self.isolated {
                self.isolated_update(property, &usage)
            } else {
                unified_update(property, &usage)
            };
            match shape {
                Some(shape) => {
                    debug!(property = %name, shape = shape_name(&shape), "merged update property");
                    schema.insert(name.as_str(), shape);
                }
                None => debug!(property = %name, "property is fixed, left out of update schema"),
            }
        }
        schema.insert(TYPE_PROPERTY, PropertyShape::Uniform(self.type_descriptor()));
        schema.insert(
            DIGEST_PROPERTY,
            PropertyShape::Uniform(
                PropertyDescriptor::string()
                    .optional()
                    .with_max_length(40)
                    .with_description("Prevent changes if current configuration file has a different digest."),
            ),
        );
        schema.insert(
            DELETE_PROPERTY,
            PropertyShape::Uniform(
                PropertyDescriptor::string()
                    .optional()
                    .with_format("pve-configid-list")
                    .with_max_length(4096)
                    .with_description("A list of settings you want to delete."),
            ),
        );
        schema
    }

    fn isolated_update(&self, property: &MergedProperty, usage: &Usage<'_>) -> Option<PropertyShape> {
        if !usage.applicable.is_empty() && usage.fixed_by.is_superset(&usage.applicable) {
            return None;
        }
        let descriptor = property.descriptor.clone().optional();
        Some(if self.applies_to_all(usage) {
            PropertyShape::Uniform(descriptor)
        } else {
            PropertyShape::Restricted {
                types: usage.applicable.iter().map(|t| t.to_string()).collect(),
                descriptor,
            }
        })
    }
}

fn unified_create(property: &MergedProperty, usage: &Usage<'_>) -> PropertyShape {
    let mut descriptor = property.descriptor.clone();
    if !property.base {
        descriptor.optional = true;
    } else if descriptor.optional && !usage.using.is_empty() && usage.required == usage.using {
        descriptor.optional = false;
    }
    PropertyShape::Uniform(descriptor)
}

fn unified_update(property: &MergedProperty, usage: &Usage<'_>) -> Option<PropertyShape> {
    // Base properties keep their own optional flag and are never dropped.
    if property.base {
        return Some(PropertyShape::Uniform(property.descriptor.clone()));
    }
    if usage.using.difference(&usage.fixed_by).next().is_none() {
        return None;
    }
    Some(PropertyShape::Uniform(property.descriptor.clone().optional()))
}

fn shape_name(shape: &PropertyShape) -> &'static str {
    match shape {
        PropertyShape::Uniform(_) => "uniform",
        PropertyShape::Restricted { .. } => "restricted",
        PropertyShape::Discriminated { .. } => "discriminated",
    }
}
