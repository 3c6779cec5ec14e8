//! Property strings: a sub-object encoded as `key=value,key=value` inside a
//! single string value. One property of the sub-schema may be marked
//! `default_key`, in which case its value can be given without `key=`.

use crate::descriptor::PropertyMap;
use crate::error::ValidationError;
use crate::validator::{Validator, coerce, scalar_text};
use serde_json::{Map, Value};
use std::sync::PoisonError;

impl Validator<'_> {
    /// Parses `text` according to `format` and validates the result.
    pub fn parse_property_string(
        &self,
        format: &PropertyMap,
        text: &str,
    ) -> Result<Map<String, Value>, ValidationError> {
        let default_key = format.iter().find(|(_, d)| d.default_key);
        let mut parsed = Map::new();

        for part in text.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                    if parsed.contains_key(key) {
                        return Err(ValidationError::single(format!(
                            "duplicate key in comma-separated list property: {key}"
                        )));
                    }
                    let Some(descriptor) = format.get(key) else {
                        return Err(ValidationError::single(format!(
                            "invalid key in comma-separated list property: {key}"
                        )));
                    };
                    parsed.insert(key.to_string(), coerce(value, descriptor));
                }
                Some(_) => {
                    return Err(ValidationError::single(
                        "missing key in comma-separated list property",
                    ));
                }
                None => {
                    let Some((key, descriptor)) = default_key else {
                        return Err(ValidationError::single(
                            "value without key, but schema does not define a default key",
                        ));
                    };
                    if parsed.contains_key(key) {
                        return Err(ValidationError::single(format!(
                            "duplicate key in comma-separated list property: {key}"
                        )));
                    }
                    parsed.insert(key.clone(), coerce(part, descriptor));
                }
            }
        }

        let mut errors = ValidationError::new();
        self.check_fields("", format, &parsed, false, &mut errors);
        errors.into_result()?;
        Ok(parsed)
    }

    /// Prints `data` as a property string: the default key first without
    /// `key=`, then the remaining keys in sorted order.
    pub fn print_property_string(
        &self,
        format: &PropertyMap,
        data: &Map<String, Value>,
    ) -> Result<String, ValidationError> {
        let mut errors = ValidationError::new();
        self.check_fields("", format, data, false, &mut errors);
        errors.into_result()?;

        let default_key = format
            .iter()
            .find(|(_, d)| d.default_key)
            .map(|(k, _)| k.as_str());

        let mut parts = Vec::with_capacity(data.len());
        if let Some(key) = default_key {
            if let Some(value) = data.get(key) {
                parts.push(item_text(key, value)?);
            }
        }
        let mut keys: Vec<_> = data.keys().filter(|k| Some(k.as_str()) != default_key).collect();
        keys.sort();
        for key in keys {
            let text = item_text(key, &data[key])?;
            parts.push(format!("{key}={text}"));
        }
        Ok(parts.join(","))
    }
}

fn item_text(key: &str, value: &Value) -> Result<String, ValidationError> {
    let text = scalar_text(value)
        .ok_or_else(|| ValidationError::at(key, "value must be a scalar"))?;
    if text.contains(',') {
        return Err(ValidationError::at(key, "value must not contain a comma"));
    }
    Ok(text.into_owned())
}

/// [`Validator::parse_property_string`] with the process-wide formats.
pub fn parse_property_string(
    format: &PropertyMap,
    text: &str,
) -> Result<Map<String, Value>, ValidationError> {
    let formats = crate::format::global().read().unwrap_or_else(PoisonError::into_inner);
    Validator::new(&formats).parse_property_string(format, text)
}

/// [`Validator::print_property_string`] with the process-wide formats.
pub fn print_property_string(
    format: &PropertyMap,
    data: &Map<String, Value>,
) -> Result<String, ValidationError> {
    let formats = crate::format::global().read().unwrap_or_else(PoisonError::into_inner);
    Validator::new(&formats).print_property_string(format, data)
}
