//! Input resolution: read a paycheck from disk into an [`UploadedDocument`].
//!
//! The declared media type is taken from the file's magic bytes when they
//! are recognisable, otherwise from the extension. A file that is neither is
//! still loaded (as `application/octet-stream`) so the normalizer can reject
//! it with the user-facing "unsupported format" message.

use crate::document::{MediaType, UploadedDocument};
use crate::error::AuditError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Declared type for files we cannot identify.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Read `path`, enforcing the `max_bytes` ceiling.
pub async fn load_document(path: &Path, max_bytes: usize) -> Result<UploadedDocument, AuditError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| map_io(path, e))?;
    if !meta.is_file() {
        return Err(AuditError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if meta.len() > max_bytes as u64 {
        return Err(AuditError::DocumentTooLarge {
            size: meta.len() as usize,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| map_io(path, e))?;
    let declared = declared_type(path, &bytes);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded {} ({} bytes, {})", name, bytes.len(), declared);
    Ok(UploadedDocument::new(name, bytes, declared))
}

/// Best-effort media type for a file on disk.
pub fn declared_type(path: &Path, bytes: &[u8]) -> String {
    MediaType::sniff(bytes)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(MediaType::from_extension)
        })
        .map(|m| m.as_mime().to_string())
        .unwrap_or_else(|| UNKNOWN_MIME.to_string())
}

fn map_io(path: &Path, e: std::io::Error) -> AuditError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => AuditError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => AuditError::PermissionDenied { path },
        _ => AuditError::ReadFailed { path, source: e },
    }
}
