//! The per-request load pipeline
//!
//! Stages run strictly in sequence, each consuming the complete output of the
//! previous one: sanitize the CQL sources, translate to JSON ELM, decode and
//! parse the libraries, translate to annotated XML ELM, rebuild annotation
//! trees, resolve statement dependencies. The translator call is the only
//! await point. A failed stage aborts the whole load; no partial artifacts
//! escape.

use indexmap::IndexMap;
use log::debug;
use octofhir_cqm_annotations::{AnnotationError, LibraryAnnotations, parse_annotations};
use octofhir_cqm_deps::{DependencyMap, DependencyResolver, StatementReference};
use octofhir_cqm_elm::{CompiledLibrary, LibraryEnvelope, normalize_oids};
use octofhir_cqm_translator::{
    ElmFormat, ElmTranslator, MeasureObservation, MultipartError, TranslationError,
    parse_multipart, sanitize_function_names,
};
use thiserror::Error;

/// One measure load: the raw CQL sources plus caller-supplied context
#[derive(Debug, Clone, Default)]
pub struct MeasureLoadRequest {
    /// Raw CQL text of every library in the load
    pub sources: Vec<String>,
    /// Measure-observation side table referencing functions by name
    pub observations: Vec<MeasureObservation>,
    /// Root statements per population category, e.g. `"IPP"` or `"NUMER"`;
    /// names are treated as opaque
    pub population_roots: IndexMap<String, Vec<StatementReference>>,
}

impl MeasureLoadRequest {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }
}

/// The artifacts of a successful load
#[derive(Debug, Clone)]
pub struct LoadedMeasure {
    /// Compiled libraries, in submission order
    pub libraries: Vec<CompiledLibrary>,
    /// library id -> annotation trees, keyed in response order
    pub elm_annotations: IndexMap<String, LibraryAnnotations>,
    /// library id -> statement -> referenced definitions
    pub statement_dependencies: DependencyMap,
    /// Observation side table, rewritten to the sanitized function names
    pub observations: Vec<MeasureObservation>,
}

/// Fatal conditions aborting a load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// A decoded part is not valid JSON ELM
    #[error("library payload is not valid ELM JSON: {0}")]
    ElmDecode(#[from] serde_json::Error),

    /// The translator returned a different number of parts than libraries
    #[error("translator returned {actual} parts for {expected} libraries")]
    PartCountMismatch { expected: usize, actual: usize },
}

/// Run the full post-translation pipeline for one load request
pub async fn load_measure(
    translator: &dyn ElmTranslator,
    mut request: MeasureLoadRequest,
) -> Result<LoadedMeasure, LoadError> {
    let renames = sanitize_function_names(&mut request.sources, &mut request.observations);
    debug!("load begins: {} libraries, {} renames", request.sources.len(), renames.len());

    let json_body = translator
        .translate(&request.sources, ElmFormat::Json)
        .await?;
    let json_parts = parse_multipart(&json_body)?;
    check_part_count(request.sources.len(), json_parts.len())?;

    let libraries = json_parts
        .iter()
        .map(|part| decode_library(&part.body))
        .collect::<Result<Vec<_>, _>>()?;

    let xml_body = translator
        .translate(&request.sources, ElmFormat::Xml)
        .await?;
    let xml_parts = parse_multipart(&xml_body)?;
    check_part_count(libraries.len(), xml_parts.len())?;

    let mut elm_annotations = IndexMap::new();
    for part in &xml_parts {
        let parsed = parse_annotations(&part.body, &libraries)?;
        elm_annotations.insert(parsed.identifier.id.clone(), parsed);
    }

    let roots: Vec<StatementReference> = request
        .population_roots
        .values()
        .flatten()
        .cloned()
        .collect();
    let statement_dependencies = DependencyResolver::new(&libraries).resolve(&roots);

    Ok(LoadedMeasure {
        libraries,
        elm_annotations,
        statement_dependencies,
        observations: request.observations,
    })
}

fn decode_library(body: &str) -> Result<CompiledLibrary, LoadError> {
    let normalized = normalize_oids(body);
    let envelope: LibraryEnvelope = serde_json::from_str(&normalized)?;
    Ok(envelope.library)
}

fn check_part_count(expected: usize, actual: usize) -> Result<(), LoadError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LoadError::PartCountMismatch { expected, actual })
    }
}
