//! Document normalization: uploaded bytes → model-ready payload.
//!
//! * PDF is passed through, base64-encoded, media type unchanged.
//! * JPEG/PNG go through [`super::enhance`] and are sent as `image/jpeg`.
//!   If enhancement cannot run, the original bytes and media type are sent.
//! * Anything else is rejected before any network call.
//!
//! The pixel work runs under `spawn_blocking` so a large photo does not stall
//! the runtime's worker threads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use super::enhance::{self, Enhancement, RenderSupport};
use crate::document::{MediaType, NormalizedPayload, UploadedDocument};
use crate::error::AuditError;

/// Payload plus a record of what was done to produce it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub payload: NormalizedPayload,
    pub enhancement: Enhancement,
}

/// Blocking normalization of one document.
pub fn normalize_document(
    doc: &UploadedDocument,
    support: RenderSupport,
) -> Result<Normalized, AuditError> {
    let media_type = doc
        .media_type()
        .ok_or_else(|| AuditError::UnsupportedFormat {
            media_type: doc.declared_type.clone(),
        })?;

    match media_type {
        MediaType::Pdf => {
            debug!("PDF passthrough: {} ({})", doc.name, doc.size_mb());
            Ok(Normalized {
                payload: NormalizedPayload {
                    data: STANDARD.encode(&doc.bytes),
                    media_type: MediaType::Pdf,
                },
                enhancement: Enhancement::NotApplicable,
            })
        }
        MediaType::Jpeg | MediaType::Png => match enhance::enhance_image(&doc.bytes, support) {
            Ok(jpeg) => Ok(Normalized {
                payload: NormalizedPayload {
                    data: STANDARD.encode(&jpeg),
                    media_type: MediaType::Jpeg,
                },
                enhancement: Enhancement::Applied,
            }),
            Err(reason) => {
                debug!("Enhancement skipped for {}: {}", doc.name, reason);
                Ok(Normalized {
                    payload: NormalizedPayload {
                        data: STANDARD.encode(&doc.bytes),
                        media_type,
                    },
                    enhancement: Enhancement::Fallback(reason),
                })
            }
        },
    }
}

/// Async wrapper: runs [`normalize_document`] on the blocking pool.
pub async fn normalize(
    doc: UploadedDocument,
    support: RenderSupport,
) -> Result<Normalized, AuditError> {
    if !doc
        .media_type()
        .is_some_and(MediaType::is_image)
    {
        return normalize_document(&doc, support);
    }

    let name = doc.name.clone();
    let normalized = tokio::task::spawn_blocking(move || normalize_document(&doc, support))
        .await
        .map_err(|e| AuditError::Internal(format!("Normalization task panicked: {e}")))??;

    info!(
        "Normalized {} → {} ({} base64 chars)",
        name,
        normalized.payload.media_type,
        normalized.payload.data.len()
    );
    Ok(normalized)
}
