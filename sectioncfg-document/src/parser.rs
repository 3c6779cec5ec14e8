//! Section config text parser.
//!
//! ```text
//! # comment
//! dir: local
//! 	path /var/lib/vz
//! 	shared
//!
//! nfs: backup
//! 	server 10.0.0.2
//! ```
//!
//! A section is a `type: id` header followed by indented `key value` lines
//! and ends at the next blank line. A key without a value sets a boolean.

use crate::codec::DocumentCodec;
use crate::document::{SectionDocument, SectionRecord, compute_digest};
use crate::error::ParseWarning;
use sectioncfg_registry::Fields;
use sectioncfg_schema::{TYPE_PROPERTY, verify_configid};
use serde_json::Value;
use tracing::{debug, warn};

impl DocumentCodec {
    /// Parses `text`. Never fails: unusable sections and lines are dropped
    /// and reported in [`SectionDocument::warnings`].
    pub fn parse(&self, text: &str) -> SectionDocument {
        let mut document = SectionDocument::from_parts(compute_digest(text), Vec::new());
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim_start().starts_with('#'))
            .peekable();
        let mut priority = 0;

        while let Some((line_no, line)) = lines.next() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((section_type, id)) = parse_header(line) else {
                push_warning(
                    document.warnings_mut(),
                    ParseWarning::new(line_no, format!("ignore config line: {line}")),
                );
                continue;
            };

            let mut body = Vec::new();
            while let Some(entry) = lines.next_if(|(_, l)| !l.trim().is_empty()) {
                body.push(entry);
            }

            if document.contains(id) {
                push_warning(
                    document.warnings_mut(),
                    ParseWarning::new(line_no, "skip section: duplicate section id").in_section(id),
                );
                continue;
            }
            let mut warnings = Vec::new();
            let record = self.parse_section(line_no, section_type, id, &body, &mut warnings);
            document.warnings_mut().append(&mut warnings);
            if let Some(record) = record {
                priority += 1;
                debug!(section_type, id, priority, "parsed section");
                document.push_parsed(record, priority);
            }
        }
        document
    }

    fn parse_section(
        &self,
        header_line: usize,
        section_type: &str,
        id: &str,
        body: &[(usize, &str)],
        warnings: &mut Vec<ParseWarning>,
    ) -> Option<SectionRecord> {
        let skip = |message: String| {
            ParseWarning::new(header_line, format!("skip section: {message}")).in_section(id)
        };

        if let Err(e) = verify_configid(id) {
            push_warning(warnings, skip(format!("invalid section id - {e}")));
            return None;
        }
        let known = self.config.has_type(section_type);
        if !known && !self.allow_unknown {
            push_warning(warnings, skip(format!("unsupported type '{section_type}'")));
            return None;
        }

        let mut record = SectionRecord::new(section_type, id);
        for &(line_no, line) in body {
            let Some((key, value)) = parse_option(line) else {
                push_warning(
                    warnings,
                    ParseWarning::new(line_no, format!("ignore config line: {line}")).in_section(id),
                );
                continue;
            };

            // The header carries the type.
            if key == TYPE_PROPERTY {
                push_warning(
                    warnings,
                    ParseWarning::new(line_no, format!("ignore config line: reserved property '{key}'"))
                        .in_section(id)
                        .for_key(key),
                );
                continue;
            }

            if !known || !self.config.uses_property(section_type, key) {
                if self.allow_unknown {
                    push_raw(&mut record.fields, key, value);
                    continue;
                }
                push_warning(
                    warnings,
                    ParseWarning::new(line_no, format!("skip section: unexpected property '{key}'"))
                        .in_section(id)
                        .for_key(key),
                );
                return None;
            }

            let is_array = self.config.property(key).is_some_and(|d| d.is_array());
            if !is_array && record.fields.contains_key(key) {
                push_warning(
                    warnings,
                    ParseWarning::new(line_no, format!("skip section: duplicate attribute '{key}'"))
                        .in_section(id)
                        .for_key(key),
                );
                return None;
            }

            let raw = value.map(|v| Value::String(v.to_string()));
            match self.config.check_value(section_type, key, raw.as_ref()) {
                Ok(value) if is_array => push_item(&mut record.fields, key, value),
                Ok(value) => {
                    record.fields.insert(key.to_string(), value);
                }
                Err(e) => push_warning(
                    warnings,
                    ParseWarning::new(line_no, format!("unable to parse value of '{key}': {e}"))
                        .in_section(id)
                        .for_key(key),
                ),
            }
        }

        if known {
            if let Err(e) = self.config.verify_record(section_type, id, &record.fields, true) {
                push_warning(warnings, skip(e.to_string()));
                return None;
            }
        }
        Some(record)
    }
}

fn push_warning(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    warn!(
        line = warning.line,
        section = warning.section.as_deref().unwrap_or("-"),
        "{}",
        warning.message
    );
    warnings.push(warning);
}

/// `type: id` at the start of a line.
fn parse_header(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (section_type, id) = line.trim_end().split_once(':')?;
    let id = id.trim_start();
    if section_type.is_empty()
        || id.is_empty()
        || section_type.contains(char::is_whitespace)
        || id.contains(char::is_whitespace)
    {
        return None;
    }
    Some((section_type, id))
}

/// An indented `key` or `key value` line. The value is trimmed.
fn parse_option(line: &str) -> Option<(&str, Option<&str>)> {
    if !line.starts_with(char::is_whitespace) {
        return None;
    }
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((key, value)) => Some((key, Some(value.trim_start()))),
        None => Some((line, None)),
    }
}

fn push_raw(fields: &mut Fields, key: &str, value: Option<&str>) {
    let value = value.map_or(Value::Bool(true), |v| Value::String(v.to_string()));
    match fields.get_mut(key) {
        None => {
            fields.insert(key.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn push_item(fields: &mut Fields, key: &str, value: Value) {
    match fields.entry(key.to_string()).or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(items) => items.push(value),
        other => *other = Value::Array(vec![other.take(), value]),
    }
}
