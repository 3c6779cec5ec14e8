//! Error types for the plugin registry.

use thiserror::Error;

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Registry problems. All of these are structural and surface at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate plugin registration (type = {0})")]
    DuplicateType(String),

    #[error("invalid section type name: {0:?}")]
    InvalidTypeName(String),

    #[error("undefined property '{property}' referenced by type '{section_type}'")]
    UnknownProperty {
        section_type: String,
        property: String,
    },

    #[error("duplicate property '{property}': type '{section_type}' redefines a base property")]
    DuplicateProperty {
        section_type: String,
        property: String,
    },

    #[error("conflicting definitions of property '{property}' in types '{first}' and '{second}'")]
    ConflictingProperty {
        property: String,
        first: String,
        second: String,
    },

    #[error("plugin registry is already initialized")]
    AlreadyInitialized,

    #[error("plugin registry is not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}
