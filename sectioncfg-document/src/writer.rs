//! Section config text writer.

use crate::codec::DocumentCodec;
use crate::document::{SectionDocument, SectionRecord};
use crate::error::SerializationError;
use sectioncfg_schema::{TYPE_PROPERTY, scalar_text};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

impl DocumentCodec {
    /// Writes every section in order. Required options come first, then
    /// the other options the type uses, then any raw keys kept from parsing.
    pub fn write(&self, document: &SectionDocument) -> Result<String, SerializationError> {
        let mut out = String::new();
        for record in document.iter_ordered() {
            self.write_section(&mut out, record)?;
        }
        debug!(sections = document.len(), bytes = out.len(), "wrote section config");
        Ok(out)
    }

    fn write_section(&self, out: &mut String, record: &SectionRecord) -> Result<(), SerializationError> {
        let id = record.id.as_str();
        check_header(record)?;

        let options = self.config.options_for(&record.section_type);
        let plugin = self.config.plugin(&record.section_type);
        if options.is_none() && !self.allow_unknown {
            return Err(SerializationError::UnknownType {
                id: id.to_string(),
                section_type: record.section_type.clone(),
            });
        }

        out.push_str(&format!("{}: {}\n", record.section_type, id));
        let mut done = BTreeSet::new();

        if let (Some(options), Some(plugin)) = (options, plugin) {
            let (required, optional): (Vec<_>, Vec<_>) =
                options.iter().partition(|(_, option)| option.required);

            for (key, _) in required {
                done.insert(key.as_str());
                let Some(value) = record.fields.get(key).filter(|v| !v.is_null()) else {
                    return Err(SerializationError::MissingRequired {
                        id: id.to_string(),
                        key: key.clone(),
                    });
                };
                let encoded = plugin.encode_value(key, value).map_err(|message| encode_error(id, key, message))?;
                write_option(out, id, key, &encoded)?;
            }
            for (key, _) in optional {
                done.insert(key.as_str());
                let Some(value) = record.fields.get(key).filter(|v| !v.is_null()) else {
                    continue;
                };
                let encoded = plugin.encode_value(key, value).map_err(|message| encode_error(id, key, message))?;
                write_option(out, id, key, &encoded)?;
            }
        }

        if self.allow_unknown {
            for (key, value) in &record.fields {
                if key == TYPE_PROPERTY || done.contains(key.as_str()) {
                    continue;
                }
                write_option(out, id, key, value)?;
            }
        }

        out.push('\n');
        Ok(())
    }
}

fn encode_error(id: &str, key: &str, message: String) -> SerializationError {
    SerializationError::Encode {
        id: id.to_string(),
        key: key.to_string(),
        message,
    }
}

fn check_header(record: &SectionRecord) -> Result<(), SerializationError> {
    let invalid = |s: &str| s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == ':');
    if invalid(&record.section_type) || invalid(&record.id) {
        return Err(SerializationError::InvalidHeader {
            id: record.id.clone(),
            message: format!("cannot write '{}: {}'", record.section_type, record.id),
        });
    }
    Ok(())
}

fn write_option(out: &mut String, id: &str, key: &str, value: &Value) -> Result<(), SerializationError> {
    if key.contains(['\n', '\r']) {
        return Err(SerializationError::LineBreak {
            id: id.to_string(),
            key: key.to_string(),
        });
    }
    match value {
        Value::Null => {}
        Value::Bool(true) => out.push_str(&format!("\t{key}\n")),
        Value::Bool(false) => out.push_str(&format!("\t{key} 0\n")),
        Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(encode_error(id, key, "nested arrays cannot be written".into()));
                }
                write_option(out, id, key, item)?;
            }
        }
        Value::Object(_) => {
            return Err(encode_error(id, key, "objects cannot be written".into()));
        }
        scalar => {
            let text = scalar_text(scalar).unwrap_or_default();
            if text.contains(['\n', '\r']) {
                return Err(SerializationError::LineBreak {
                    id: id.to_string(),
                    key: key.to_string(),
                });
            }
            if !text.is_empty() {
                out.push_str(&format!("\t{key} {text}\n"));
            }
        }
    }
    Ok(())
}
