//! Uploaded documents and the model-ready payload they normalise into.
//!
//! Only three media types ever reach the inference service: PDF, JPEG and
//! PNG. [`MediaType`] is a closed enum, so a [`NormalizedPayload`] cannot
//! carry anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media types accepted by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
}

impl MediaType {
    /// All accepted types, in the order they are listed to the user.
    pub const ACCEPTED: [MediaType; 3] = [MediaType::Jpeg, MediaType::Png, MediaType::Pdf];

    /// The MIME string sent on the wire.
    pub fn as_mime(self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Parse a declared MIME type.
    ///
    /// Case and surrounding whitespace are ignored, as are parameters
    /// (`image/png; charset=binary`). `image/jpg` is accepted as an alias
    /// because some browsers and scanners still emit it.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(MediaType::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            _ => None,
        }
    }

    /// Guess from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(MediaType::Pdf),
            "jpg" | "jpeg" | "jpe" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            _ => None,
        }
    }

    /// Identify a document by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(MediaType::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaType::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']) {
            Some(MediaType::Png)
        } else {
            None
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, MediaType::Pdf)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// A document selected by the user, held only for the duration of one analysis.
///
/// `declared_type` is kept as the raw string the caller supplied: an
/// unsupported declaration must still be representable so it can be
/// rejected with [`crate::AuditError::UnsupportedFormat`].
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub declared_type: String,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            declared_type: declared_type.into(),
        }
    }

    /// The declared type, if it is one of the accepted three.
    pub fn media_type(&self) -> Option<MediaType> {
        MediaType::from_mime(&self.declared_type)
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Size in MB with two decimals, e.g. `"1.25 MB"`.
    pub fn size_mb(&self) -> String {
        format!("{:.2} MB", self.bytes.len() as f64 / 1024.0 / 1024.0)
    }
}

// Document bytes are personal data; never dump them into logs.
impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("declared_type", &self.declared_type)
            .finish()
    }
}

/// Model-ready document: base64 data plus one of the three accepted types.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPayload {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub media_type: MediaType,
}

impl fmt::Debug for NormalizedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedPayload")
            .field("data", &format_args!("<{} base64 chars>", self.data.len()))
            .field("media_type", &self.media_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_parsing_is_lenient_but_closed() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_mime(" Image/PNG "), Some(MediaType::Png));
        assert_eq!(MediaType::from_mime("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(
            MediaType::from_mime("image/jpeg; quality=90"),
            Some(MediaType::Jpeg)
        );
        assert_eq!(MediaType::from_mime("image/gif"), None);
        assert_eq!(MediaType::from_mime("image/webp"), None);
        assert_eq!(MediaType::from_mime(""), None);
    }

    #[test]
    fn sniff_magic_bytes() {
        assert_eq!(MediaType::sniff(b"%PDF-1.7\n"), Some(MediaType::Pdf));
        assert_eq!(MediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(MediaType::Jpeg));
        assert_eq!(
            MediaType::sniff(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0]),
            Some(MediaType::Png)
        );
        assert_eq!(MediaType::sniff(b"GIF89a"), None);
        assert_eq!(MediaType::sniff(b""), None);
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_extension("tiff"), None);
    }

    #[test]
    fn size_display() {
        let doc = UploadedDocument::new("x.pdf", vec![0u8; 1024 * 1024 + 512 * 1024], "application/pdf");
        assert_eq!(doc.size_mb(), "1.50 MB");
        assert_eq!(doc.size_bytes(), 1_572_864);
    }

    #[test]
    fn debug_hides_bytes() {
        let doc = UploadedDocument::new("holerite.png", vec![1, 2, 3], "image/png");
        let dbg = format!("{doc:?}");
        assert!(dbg.contains("<3 bytes>"), "got: {dbg}");
    }

    #[test]
    fn payload_wire_format() {
        let p = NormalizedPayload {
            data: "QUJD".into(),
            media_type: MediaType::Jpeg,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["data"], "QUJD");
    }
}
