use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sub-schema used by inline formats and object properties.
pub type PropertyMap = BTreeMap<String, PropertyDescriptor>;

/// Describes a single property: its kind plus the constraints checked by
/// the [`Validator`](crate::Validator).
///
/// Serializes with JSON-schema key names (`type`, `enum`, `minLength`, ...)
/// so the merged create/update schemas can be handed to API consumers as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Regex matched against the whole value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Item schema. Only meaningful when kind is `Array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyDescriptor>>,
    /// Nested properties. Only meaningful when kind is `Object`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    /// Inside a property string, this key may be given without `key=`.
    #[serde(default, rename = "default_key", skip_serializing_if = "is_false")]
    pub default_key: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The primitive kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Integer => "integer",
            PropertyKind::Number => "number",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Array => "array",
            PropertyKind::Object => "object",
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value format: either a name looked up in the
/// [`FormatRegistry`](crate::FormatRegistry) or an inline sub-schema whose
/// values are encoded as a `key=value,...` property string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Format {
    Named(String),
    Inline(PropertyMap),
}

impl PropertyDescriptor {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            optional: false,
            description: None,
            default: None,
            format: None,
            enum_values: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            items: None,
            properties: None,
            default_key: false,
        }
    }

    /// Shorthand for a string property.
    pub fn string() -> Self {
        Self::new(PropertyKind::String)
    }

    /// Shorthand for an integer property.
    pub fn integer() -> Self {
        Self::new(PropertyKind::Integer)
    }

    /// Shorthand for a floating point property.
    pub fn number() -> Self {
        Self::new(PropertyKind::Number)
    }

    /// Shorthand for a boolean property.
    pub fn boolean() -> Self {
        Self::new(PropertyKind::Boolean)
    }

    /// Shorthand for an array property. In the section text format every
    /// item is written on its own line.
    pub fn array(items: PropertyDescriptor) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(PropertyKind::Array)
        }
    }

    /// Shorthand for an object property with nested properties.
    pub fn object(properties: PropertyMap) -> Self {
        Self {
            properties: Some(properties),
            ..Self::new(PropertyKind::Object)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_format(mut self, name: impl Into<String>) -> Self {
        self.format = Some(Format::Named(name.into()));
        self
    }

    pub fn with_inline_format(mut self, format: PropertyMap) -> Self {
        self.format = Some(Format::Inline(format));
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn as_default_key(mut self) -> Self {
        self.default_key = true;
        self
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == PropertyKind::Boolean
    }

    pub fn is_array(&self) -> bool {
        self.kind == PropertyKind::Array
    }

    /// Returns the named format, if any.
    pub fn format_name(&self) -> Option<&str> {
        match &self.format {
            Some(Format::Named(name)) => Some(name),
            _ => None,
        }
    }
}
