//! In-memory form of a section config file.

use crate::error::{DocumentError, ParseWarning, Result};
use sectioncfg_registry::Fields;
use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// SHA-1 of the raw file contents, hex encoded.
pub fn compute_digest(text: &str) -> String {
    hex::encode(Sha1::digest(text.as_bytes()))
}

/// One `type: id` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    #[serde(rename = "type")]
    pub section_type: String,
    pub id: String,
    pub fields: Fields,
}

impl SectionRecord {
    pub fn new(section_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            id: id.into(),
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Parsed sections keyed by id, plus the order they appeared in and the
/// digest of the text they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDocument {
    records: BTreeMap<String, SectionRecord>,
    order: BTreeMap<String, u64>,
    digest: String,
    warnings: Vec<ParseWarning>,
}

impl Default for SectionDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionDocument {
    /// An empty document, as if parsed from an empty file.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            order: BTreeMap::new(),
            digest: compute_digest(""),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn from_parts(digest: String, warnings: Vec<ParseWarning>) -> Self {
        Self {
            records: BTreeMap::new(),
            order: BTreeMap::new(),
            digest,
            warnings,
        }
    }

    pub(crate) fn push_parsed(&mut self, record: SectionRecord, priority: u64) {
        self.order.insert(record.id.clone(), priority);
        self.records.insert(record.id.clone(), record);
    }

    pub(crate) fn warnings_mut(&mut self) -> &mut Vec<ParseWarning> {
        &mut self.warnings
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SectionRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SectionRecord> {
        self.records.get_mut(id)
    }

    /// Position of a parsed section in its file. Sections added after
    /// parsing have none and are written after all others.
    pub fn priority(&self, id: &str) -> Option<u64> {
        self.order.get(id).copied()
    }

    /// Adds or replaces a section. A replaced section keeps its position.
    pub fn insert(&mut self, record: SectionRecord) -> Option<SectionRecord> {
        self.records.insert(record.id.clone(), record)
    }

    pub fn remove(&mut self, id: &str) -> Option<SectionRecord> {
        self.order.remove(id);
        self.records.remove(id)
    }

    /// Sections in write order: by priority, then the unpositioned ones
    /// sorted by id.
    pub fn iter_ordered(&self) -> Vec<&SectionRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| {
            let rank = |r: &SectionRecord| self.priority(&r.id).unwrap_or(u64::MAX);
            rank(a).cmp(&rank(b)).then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// Fails if the caller saw a different version of the file.
    /// Callers that send no digest skip the check.
    pub fn assert_digest(&self, expected: Option<&str>) -> Result<()> {
        match expected {
            Some(expected) if expected != self.digest => Err(DocumentError::DigestMismatch {
                expected: expected.to_string(),
                actual: self.digest.clone(),
            }),
            _ => Ok(()),
        }
    }
}
