//! Object schemas as produced by the schema merger.
//!
//! Properties are kept as a tagged [`PropertyShape`] and only turned into the
//! `oneOf` / `instance-types` / `type-property` convention when serialized.

use crate::descriptor::PropertyDescriptor;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the property that discriminates section types.
pub const TYPE_PROPERTY: &str = "type";

/// How a property applies across the registered section types.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyShape {
    /// Same descriptor for every type.
    Uniform(PropertyDescriptor),
    /// Only valid for the listed types (sorted).
    Restricted {
        types: Vec<String>,
        descriptor: PropertyDescriptor,
    },
    /// One branch per type, differing in requiredness.
    Discriminated { branches: Vec<Branch> },
}

/// A single per-type branch of a discriminated property.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub section_type: String,
    pub descriptor: PropertyDescriptor,
}

impl PropertyShape {
    /// The descriptor that applies to `section_type`, or `None` if the
    /// property is not available for that type.
    ///
    /// With an unknown type the first descriptor is returned, so callers can
    /// still check the value itself.
    pub fn descriptor_for(&self, section_type: Option<&str>) -> Option<&PropertyDescriptor> {
        match (self, section_type) {
            (PropertyShape::Uniform(d), _) => Some(d),
            (PropertyShape::Restricted { types, descriptor }, Some(t)) => {
                types.iter().any(|x| x == t).then_some(descriptor)
            }
            (PropertyShape::Restricted { descriptor, .. }, None) => Some(descriptor),
            (PropertyShape::Discriminated { branches }, Some(t)) => branches
                .iter()
                .find(|b| b.section_type == t)
                .map(|b| &b.descriptor),
            (PropertyShape::Discriminated { branches }, None) => {
                branches.first().map(|b| &b.descriptor)
            }
        }
    }

    /// Types this property is limited to, or `None` if it applies to all.
    pub fn instance_types(&self) -> Option<Vec<&str>> {
        match self {
            PropertyShape::Uniform(_) => None,
            PropertyShape::Restricted { types, .. } => {
                Some(types.iter().map(String::as_str).collect())
            }
            PropertyShape::Discriminated { branches } => {
                Some(branches.iter().map(|b| b.section_type.as_str()).collect())
            }
        }
    }

    /// True if no type requires the property.
    pub fn is_optional(&self) -> bool {
        match self {
            PropertyShape::Uniform(d) | PropertyShape::Restricted { descriptor: d, .. } => {
                d.optional
            }
            PropertyShape::Discriminated { branches } => {
                branches.iter().all(|b| b.descriptor.optional)
            }
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!(self)
    }
}

#[derive(Serialize)]
struct Annotated<'a> {
    #[serde(flatten)]
    descriptor: &'a PropertyDescriptor,
    #[serde(rename = "instance-types")]
    instance_types: &'a [String],
    #[serde(rename = "type-property", skip_serializing_if = "Option::is_none")]
    type_property: Option<&'static str>,
}

#[derive(Serialize)]
struct OneOf<'a> {
    #[serde(rename = "type-property")]
    type_property: &'static str,
    #[serde(rename = "oneOf")]
    one_of: Vec<Annotated<'a>>,
}

impl Serialize for PropertyShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyShape::Uniform(d) => d.serialize(serializer),
            PropertyShape::Restricted { types, descriptor } => Annotated {
                descriptor,
                instance_types: types,
                type_property: Some(TYPE_PROPERTY),
            }
            .serialize(serializer),
            PropertyShape::Discriminated { branches } => OneOf {
                type_property: TYPE_PROPERTY,
                one_of: branches
                    .iter()
                    .map(|b| Annotated {
                        descriptor: &b.descriptor,
                        instance_types: std::slice::from_ref(&b.section_type),
                        type_property: None,
                    })
                    .collect(),
            }
            .serialize(serializer),
        }
    }
}

/// A `{type: object, additionalProperties, properties}` schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, PropertyShape>,
    pub additional_properties: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyShape> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, shape: PropertyShape) {
        self.properties.insert(name.into(), shape);
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Shorthand for the descriptor of a uniform property.
    pub fn uniform(&self, name: &str) -> Option<&PropertyDescriptor> {
        match self.properties.get(name) {
            Some(PropertyShape::Uniform(d)) => Some(d),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!(self)
    }
}

impl Serialize for ObjectSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("additionalProperties", &self.additional_properties)?;
        map.serialize_entry("properties", &self.properties)?;
        map.end()
    }
}
