//! Annotation parsing errors
//!
//! A reference whose `localId` resolves to nothing is a designed no-op, not
//! an error; everything below aborts the library's annotation parse.

use thiserror::Error;

/// Errors raised while parsing an XML ELM annotation document
#[derive(Debug, Clone, Error)]
pub enum AnnotationError {
    /// The document is not well-formed XML
    #[error("malformed annotation document: {0}")]
    Xml(String),

    /// The document carries no library identifier to correlate on
    #[error("annotation document has no library identifier")]
    MissingIdentifier,

    /// No compiled library in the working set matches the document
    #[error("annotation document for library '{id}' has no matching compiled library")]
    UnmatchedLibrary { id: String },
}
