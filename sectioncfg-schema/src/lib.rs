//! Schema primitives for sectioncfg.
//!
//! Defines the building blocks shared by the plugin registry and the
//! document codec:
//! - [`PropertyDescriptor`] — what a single property looks like
//! - [`PropertyShape`] / [`ObjectSchema`] — merged create/update schemas,
//!   serialized with the `oneOf` / `instance-types` / `type-property`
//!   extensions
//! - [`Validator`] — checks values and whole objects, collecting every
//!   violation into a [`ValidationError`]
//! - [`FormatRegistry`] — named value formats contributed by other modules
//! - property strings — `key=value,...` sub-objects inside a string value

mod descriptor;
mod error;
pub mod format;
mod property_string;
mod shape;
mod validator;

pub use descriptor::{Format, PropertyDescriptor, PropertyKind, PropertyMap};
pub use error::{FormatError, ValidationError};
pub use format::{
    CONFIGID_FORMAT, FormatFn, FormatRegistry, register_format, split_list, verify_configid,
};
pub use property_string::{parse_property_string, print_property_string};
pub use shape::{Branch, ObjectSchema, PropertyShape, TYPE_PROPERTY};
pub use validator::{
    MAX_DEPTH, Validator, check, coerce, parse_boolean, scalar_text, validate,
};
