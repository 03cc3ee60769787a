//! CQM measure post-translation processing for Rust
//!
//! This crate turns the output of an external CQL-to-ELM translation service
//! into the two artifacts a calculation engine and UI consume:
//! - a statement dependency graph across all compiled libraries
//! - a human-readable annotation tree per definition, correlated to the
//!   compiled ELM by `localId`
//!
//! # Example
//!
//! ```ignore
//! use octofhir_cqm::{MeasureLoadRequest, load_measure};
//!
//! let request = MeasureLoadRequest::new(cql_sources);
//! let measure = load_measure(&translator, request).await?;
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_cqm_annotations as annotations;
pub use octofhir_cqm_deps as deps;
pub use octofhir_cqm_elm as elm;
pub use octofhir_cqm_translator as translator;

// Convenience re-exports
pub use octofhir_cqm_annotations::{AnnotationNode, LibraryAnnotations};
pub use octofhir_cqm_deps::{DependencyMap, StatementReference};
pub use octofhir_cqm_elm::CompiledLibrary;
pub use octofhir_cqm_translator::{ElmFormat, ElmTranslator, MeasureObservation};

pub mod loader;

pub use loader::{LoadError, LoadedMeasure, MeasureLoadRequest, load_measure};
