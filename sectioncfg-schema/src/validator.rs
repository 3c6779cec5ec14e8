//! Value validation against property descriptors and object schemas.

use crate::descriptor::{Format, PropertyDescriptor, PropertyKind, PropertyMap};
use crate::error::{ValidationError, join_path};
use crate::format::{self, FormatRegistry};
use crate::shape::{ObjectSchema, TYPE_PROPERTY};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Values nested deeper than this are rejected as malformed.
pub const MAX_DEPTH: usize = 32;

pub(crate) const MISSING: &str = "property is missing and it is not optional";
pub(crate) const NOT_DEFINED: &str =
    "property is not defined in schema and the schema does not allow additional properties";

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("static regex"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("static regex")
});

/// Compiled `pattern` constraints, keyed by the pattern source.
static PATTERNS: LazyLock<RwLock<HashMap<String, Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Anchored regex for a descriptor `pattern`, compiled once per process.
pub(crate) fn compiled_pattern(pattern: &str) -> Result<Regex, String> {
    if let Some(re) = PATTERNS.read().unwrap_or_else(PoisonError::into_inner).get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
    PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pattern.to_string(), re.clone());
    Ok(re)
}

/// Checks values against descriptors, resolving named formats through a
/// [`FormatRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    formats: &'a FormatRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(formats: &'a FormatRegistry) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &'a FormatRegistry {
        self.formats
    }

    /// Checks a single value against `descriptor`.
    ///
    /// Presence is the caller's concern here; see [`Validator::validate`]
    /// for object-level checks.
    pub fn check(&self, value: &Value, descriptor: &PropertyDescriptor) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        self.check_prop("", value, descriptor, &mut errors);
        errors.into_result()
    }

    /// Validates a whole request or record against an object schema and
    /// reports every violation at once.
    pub fn validate(&self, value: &Value, schema: &ObjectSchema) -> Result<(), ValidationError> {
        if exceeds_depth(value, MAX_DEPTH) {
            return Err(ValidationError::single(format!(
                "malformed input: value nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let Some(object) = value.as_object() else {
            return Err(ValidationError::single(kind_error(PropertyKind::Object, value)));
        };
        let section_type = object.get(TYPE_PROPERTY).and_then(Value::as_str);

        let mut errors = ValidationError::new();
        for (key, shape) in &schema.properties {
            let present = object.get(key).filter(|v| !v.is_null());
            match (shape.descriptor_for(section_type), present) {
                (Some(descriptor), Some(v)) => self.check_prop(key, v, descriptor, &mut errors),
                (Some(descriptor), None) if !descriptor.optional => errors.add(key.as_str(), MISSING),
                (None, Some(_)) => errors.add(
                    key.as_str(),
                    format!(
                        "property is not allowed for type '{}'",
                        section_type.unwrap_or_default()
                    ),
                ),
                _ => {}
            }
        }
        if !schema.additional_properties {
            for key in object.keys().filter(|k| !schema.contains(k)) {
                errors.add(key.as_str(), NOT_DEFINED);
            }
        }
        errors.into_result()
    }

    /// Checks `value` as an object with the given properties, recording
    /// violations below `path`.
    pub fn check_object(
        &self,
        path: &str,
        properties: &PropertyMap,
        value: &Value,
        additional_properties: bool,
        errors: &mut ValidationError,
    ) {
        let Some(object) = value.as_object() else {
            errors.add(path, kind_error(PropertyKind::Object, value));
            return;
        };
        self.check_fields(path, properties, object, additional_properties, errors);
    }

    pub(crate) fn check_fields(
        &self,
        path: &str,
        properties: &PropertyMap,
        object: &Map<String, Value>,
        additional_properties: bool,
        errors: &mut ValidationError,
    ) {
        for (key, descriptor) in properties {
            match object.get(key).filter(|v| !v.is_null()) {
                Some(v) => self.check_prop(&join_path(path, key), v, descriptor, errors),
                None if !descriptor.optional => errors.add(join_path(path, key), MISSING),
                None => {}
            }
        }
        if !additional_properties {
            for key in object.keys().filter(|k| !properties.contains_key(*k)) {
                errors.add(join_path(path, key), NOT_DEFINED);
            }
        }
    }

    fn check_prop(
        &self,
        path: &str,
        value: &Value,
        descriptor: &PropertyDescriptor,
        errors: &mut ValidationError,
    ) {
        if !kind_matches(value, descriptor.kind) {
            errors.add(path, kind_error(descriptor.kind, value));
            return;
        }

        match descriptor.kind {
            PropertyKind::Array => {
                if let (Some(items), Some(values)) = (&descriptor.items, value.as_array()) {
                    for (i, item) in values.iter().enumerate() {
                        self.check_prop(&format!("{path}[{i}]"), item, items, errors);
                    }
                }
                return;
            }
            PropertyKind::Object => {
                if let Some(properties) = &descriptor.properties {
                    self.check_object(path, properties, value, false, errors);
                }
                return;
            }
            PropertyKind::String => {
                if let Err(msg) = self.check_string(value.as_str().unwrap_or_default(), descriptor) {
                    errors.add(path, msg);
                    return;
                }
            }
            PropertyKind::Integer | PropertyKind::Number => {
                if let Err(msg) = check_range(value, descriptor) {
                    errors.add(path, msg);
                    return;
                }
            }
            PropertyKind::Boolean => {}
        }

        if let (Some(allowed), Some(text)) = (&descriptor.enum_values, scalar_text(value)) {
            if !allowed.iter().any(|a| *a == text) {
                errors.add(
                    path,
                    format!(
                        "value '{text}' does not have a value in the enumeration '{}'",
                        allowed.join(", ")
                    ),
                );
            }
        }
    }

    fn check_string(&self, value: &str, descriptor: &PropertyDescriptor) -> Result<(), String> {
        match &descriptor.format {
            Some(Format::Named(name)) => self
                .formats
                .verify(name, value)
                .map_err(|e| format!("invalid format - {e}"))?,
            Some(Format::Inline(sub)) => {
                self.parse_property_string(sub, value)
                    .map_err(|e| format!("invalid format - {e}"))?;
            }
            None => {}
        }

        if let Some(pattern) = &descriptor.pattern {
            if !compiled_pattern(pattern)?.is_match(value) {
                return Err("value does not match the regex pattern".to_string());
            }
        }

        let len = value.chars().count();
        if let Some(min) = descriptor.min_length {
            if len < min {
                return Err(format!("value must have a minimum length of {min}"));
            }
        }
        if let Some(max) = descriptor.max_length {
            if len > max {
                return Err(format!("value may only be {max} characters long"));
            }
        }
        Ok(())
    }
}

fn check_range(value: &Value, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(n) = numeric(value) else {
        return Ok(());
    };
    if let Some(min) = descriptor.minimum {
        if n < min {
            return Err(format!("value must have a minimum value of {min}"));
        }
    }
    if let Some(max) = descriptor.maximum {
        if n > max {
            return Err(format!("value must have a maximum value of {max}"));
        }
    }
    Ok(())
}

fn kind_matches(value: &Value, kind: PropertyKind) -> bool {
    match (kind, value) {
        (PropertyKind::String, Value::String(_)) => true,
        (PropertyKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (PropertyKind::Integer, Value::String(s)) => INTEGER_RE.is_match(s),
        (PropertyKind::Number, Value::Number(_)) => true,
        (PropertyKind::Number, Value::String(s)) => NUMBER_RE.is_match(s),
        (PropertyKind::Boolean, Value::Bool(_)) => true,
        (PropertyKind::Boolean, Value::String(s)) => s == "1" || s == "0",
        (PropertyKind::Boolean, Value::Number(n)) => matches!(n.as_u64(), Some(0 | 1)),
        (PropertyKind::Array, Value::Array(_)) => true,
        (PropertyKind::Object, Value::Object(_)) => true,
        _ => false,
    }
}

fn kind_error(kind: PropertyKind, value: &Value) -> String {
    let got = match value {
        Value::Null => "null".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
        other => format!("'{}'", scalar_text(other).unwrap_or_default()),
    };
    format!("type check ('{kind}') failed - got {got}")
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn exceeds_depth(value: &Value, remaining: usize) -> bool {
    match value {
        Value::Array(items) => remaining == 0 || items.iter().any(|v| exceeds_depth(v, remaining - 1)),
        Value::Object(map) => remaining == 0 || map.values().any(|v| exceeds_depth(v, remaining - 1)),
        _ => false,
    }
}

/// Text form of a scalar value as it appears in config files: strings as-is,
/// numbers in decimal, booleans as `1`/`0`.
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "1" } else { "0" })),
        _ => None,
    }
}

/// Accepts the usual spellings of a boolean.
pub fn parse_boolean(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Converts raw text to the JSON value matching the descriptor kind. Text
/// that does not parse is kept as a string so validation can report it.
pub fn coerce(text: &str, descriptor: &PropertyDescriptor) -> Value {
    let parsed = match descriptor.kind {
        PropertyKind::Integer => text.parse::<i64>().ok().map(Value::from),
        PropertyKind::Number => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        PropertyKind::Boolean => parse_boolean(text).map(Value::Bool),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

/// Checks a single value using the process-wide format registry.
pub fn check(value: &Value, descriptor: &PropertyDescriptor) -> Result<(), ValidationError> {
    let formats = format::global().read().unwrap_or_else(PoisonError::into_inner);
    Validator::new(&formats).check(value, descriptor)
}

/// Validates an object using the process-wide format registry.
pub fn validate(value: &Value, schema: &ObjectSchema) -> Result<(), ValidationError> {
    let formats = format::global().read().unwrap_or_else(PoisonError::into_inner);
    Validator::new(&formats).validate(value, schema)
}
