use crate::config::Settings;
use sectioncfg_registry::SectionConfig;
use std::sync::Arc;

/// Reads and writes section config text for one initialized registry.
///
/// With `allow_unknown` set, sections of unregistered types and options a
/// type does not use are kept as raw strings instead of being dropped, and
/// are written back unchanged.
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    pub(crate) config: Arc<SectionConfig>,
    pub(crate) allow_unknown: bool,
}

impl DocumentCodec {
    pub fn new(config: Arc<SectionConfig>) -> Self {
        Self {
            config,
            allow_unknown: false,
        }
    }

    pub fn from_settings(config: Arc<SectionConfig>, settings: &Settings) -> Self {
        Self::new(config).allow_unknown(settings.parser.allow_unknown)
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }
}
