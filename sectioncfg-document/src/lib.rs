//! Text codec for sectioncfg files.
//!
//! [`DocumentCodec::parse`] turns `type: id` text into a [`SectionDocument`]
//! using the checks of an initialized
//! [`SectionConfig`](sectioncfg_registry::SectionConfig);
//! [`DocumentCodec::write`] turns it back into text. Writing a parsed
//! document and parsing it again yields the same sections in the same
//! order.

mod codec;
mod config;
mod document;
mod error;
mod parser;
mod text;
mod writer;

pub use codec::DocumentCodec;
pub use config::{ParserSettings, Settings};
pub use document::{SectionDocument, SectionRecord, compute_digest};
pub use error::{DocumentError, ParseWarning, Result, SerializationError};
pub use text::{decode_text, encode_text};
