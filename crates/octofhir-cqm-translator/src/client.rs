//! Trait seam for the external translation service
//!
//! Transport lives outside this workspace; implementations POST the load's
//! CQL sources as a multipart file payload and hand back the raw multipart
//! response body. Only the wire shape of that response is interpreted here
//! (see [`crate::multipart`]).

use crate::error::TranslationError;
use async_trait::async_trait;

/// Target encodings the translation service can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElmFormat {
    /// JSON-encoded ELM
    Json,
    /// XML-encoded ELM with annotations
    Xml,
}

impl ElmFormat {
    /// MIME type sent as the translator's target-format header
    pub fn mime_type(&self) -> &'static str {
        match self {
            ElmFormat::Json => "application/elm+json",
            ElmFormat::Xml => "application/elm+xml",
        }
    }
}

/// A client able to translate a load's CQL sources into ELM
///
/// One call carries every library of the load; a successful response is a
/// multipart body with one part per submitted library, in submission order.
/// Client errors surface as [`TranslationError::Rejected`] built from the
/// translator's JSON error body.
#[async_trait]
pub trait ElmTranslator: Send + Sync {
    /// Translate all sources into the requested target format
    async fn translate(
        &self,
        sources: &[String],
        format: ElmFormat,
    ) -> Result<String, TranslationError>;
}
