//! Error types for the transfer-audit library.
//!
//! Every failure of one analysis collapses into a single [`AuditError`]. The
//! orchestrator converts it into a terminal `Failed` state; nothing is
//! retried automatically.
//!
//! Two audiences read these errors:
//!
//! * `Display` is for logs and developers. It may include parser internals
//!   and HTTP details.
//! * [`AuditError::user_message`] is what the end user sees. It never leaks
//!   parser output, and it passes the inference service's own message through
//!   verbatim when there is one.
//!
//! Image-enhancement failures are deliberately absent: they degrade to
//! sending the original bytes and are reported as
//! [`crate::pipeline::enhance::FallbackReason`], not as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Shown when the service failed without a message of its own.
pub const GENERIC_SERVICE_MESSAGE: &str =
    "Ocorreu um erro ao processar o contracheque. Tente novamente.";

/// Shown for any response that is not a valid report.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Não foi possível gerar a análise.";

/// Shown for media types outside the accepted set.
pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "Formato não suportado. Por favor, envie um JPG, PNG ou PDF.";

/// All fatal errors returned by the transfer-audit library.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the document.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document exceeds the inline-payload ceiling.
    #[error("Document is {size} bytes, above the {limit}-byte limit")]
    DocumentTooLarge { size: usize, limit: usize },

    /// Declared media type is not PDF, JPEG or PNG.
    #[error("Unsupported media type '{media_type}' (accepted: image/jpeg, image/png, application/pdf)")]
    UnsupportedFormat { media_type: String },

    // ── Service errors ────────────────────────────────────────────────────
    /// The inference call failed: network, auth, quota, timeout.
    #[error("Inference service error: {}", message.as_deref().unwrap_or("no message"))]
    ServiceError { message: Option<String> },

    /// The service answered, but not with a valid report.
    #[error("Malformed analysis response: {detail}")]
    MalformedResponse { detail: String },

    /// The configured provider could not be built (missing credential etc.).
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Orchestration errors ──────────────────────────────────────────────
    /// An analysis was requested for an empty document.
    #[error("No document to analyze: the input is empty")]
    NoDocument,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// The message to show the end user.
    pub fn user_message(&self) -> String {
        match self {
            AuditError::UnsupportedFormat { .. } => UNSUPPORTED_FORMAT_MESSAGE.to_string(),
            AuditError::MalformedResponse { .. } => MALFORMED_RESPONSE_MESSAGE.to_string(),
            AuditError::ServiceError { message } => match message.as_deref().map(str::trim) {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => GENERIC_SERVICE_MESSAGE.to_string(),
            },
            other => other.to_string(),
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        AuditError::MalformedResponse {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_accepted_types() {
        let e = AuditError::UnsupportedFormat {
            media_type: "image/gif".into(),
        };
        assert!(e.to_string().contains("image/gif"));
        let msg = e.user_message();
        assert!(msg.contains("JPG") && msg.contains("PNG") && msg.contains("PDF"), "got: {msg}");
    }

    #[test]
    fn service_message_passes_through_verbatim() {
        let e = AuditError::ServiceError {
            message: Some("API key not valid. Please pass a valid API key.".into()),
        };
        assert_eq!(e.user_message(), "API key not valid. Please pass a valid API key.");
    }

    #[test]
    fn service_without_message_uses_fallback() {
        let e = AuditError::ServiceError { message: None };
        assert_eq!(e.user_message(), GENERIC_SERVICE_MESSAGE);

        let blank = AuditError::ServiceError {
            message: Some("   ".into()),
        };
        assert_eq!(blank.user_message(), GENERIC_SERVICE_MESSAGE);
    }

    #[test]
    fn malformed_response_hides_detail_from_user() {
        let e = AuditError::malformed("expected value at line 1 column 1");
        assert!(e.to_string().contains("line 1 column 1"));
        assert_eq!(e.user_message(), MALFORMED_RESPONSE_MESSAGE);
        assert!(!e.user_message().contains("column"));
    }

    #[test]
    fn too_large_display() {
        let e = AuditError::DocumentTooLarge {
            size: 30,
            limit: 20,
        };
        let msg = e.to_string();
        assert!(msg.contains("30") && msg.contains("20"), "got: {msg}");
    }
}
