//! Annotation tree reconstruction from XML ELM
//!
//! The translator decorates its XML ELM output with a narrative annotation
//! per definition: nested reference nodes pointing at ELM `localId`s,
//! interleaved with literal rendered source text. This crate rebuilds one
//! [`AnnotationNode`] tree per definition, discovers each definition's name
//! from its own narrative, and repairs the word-joining gaps the translator's
//! fragment boundaries introduce.

mod dom;
mod locals;
mod parser;

pub mod error;
pub mod model;

pub use error::AnnotationError;
pub use locals::LocalIdIndex;
pub use model::{AnnotationChild, AnnotationNode, LibraryAnnotations, TextFragment};
pub use parser::parse_annotations;
