//! Error taxonomy for translator interaction
//!
//! Translation and multipart failures are fatal and abort the load; they are
//! never downgraded to empty or truncated results.

use thiserror::Error;

/// Errors raised while obtaining ELM from the translation service
#[derive(Debug, Clone, Error)]
pub enum TranslationError {
    /// The translator returned a client error for the submitted CQL
    #[error("translator rejected the CQL submission: {detail}")]
    Rejected { detail: String },

    /// The request never produced a usable response
    #[error("translator request failed: {message}")]
    Transport { message: String },
}

impl TranslationError {
    /// Build a rejection from a client-error response body
    ///
    /// Prefers the translator's structured JSON error payload, pretty-printed;
    /// falls back to the raw body when the payload does not parse.
    pub fn from_error_body(body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
            .unwrap_or_else(|| body.to_string());
        Self::Rejected { detail }
    }

    /// Build a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Errors raised while splitting a multipart response body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    /// The response body has no first line to recover a boundary from
    #[error("multipart response has no boundary line")]
    MissingBoundary,

    /// A part has no empty line terminating its header block
    #[error("multipart part {index} has no header terminator")]
    MissingHeaderTerminator { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_pretty_prints_structured_body() {
        let err = TranslationError::from_error_body(
            r#"{"errorSeverity":"Error","message":"Could not resolve identifier"}"#,
        );

        let TranslationError::Rejected { detail } = err else {
            panic!("expected rejection");
        };
        assert!(detail.contains("\"errorSeverity\": \"Error\""));
        assert!(detail.contains("Could not resolve identifier"));
    }

    #[test]
    fn test_rejection_falls_back_to_raw_body() {
        let err = TranslationError::from_error_body("502 Bad Gateway");

        let TranslationError::Rejected { detail } = err else {
            panic!("expected rejection");
        };
        assert_eq!(detail, "502 Bad Gateway");
    }
}
