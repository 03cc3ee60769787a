//! Integration with the external CQL-to-ELM translation service
//!
//! This crate provides:
//! - Function-name sanitization applied to CQL sources before translation
//! - Multipart response decoding for the translator's JSON and XML replies
//! - The translator trait seam implemented by transport clients
//! - The translation error taxonomy

pub mod client;
pub mod error;
pub mod multipart;
pub mod sanitize;

pub use client::{ElmFormat, ElmTranslator};
pub use error::{MultipartError, TranslationError};
pub use multipart::{MultipartPart, parse_multipart};
pub use sanitize::{MeasureObservation, RenameTable, sanitize_function_names};
