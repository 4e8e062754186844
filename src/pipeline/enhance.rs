//! Legibility filter for photographed or scanned paychecks.
//!
//! The filter is fixed: grayscale, then contrast to 160%, then brightness to
//! 110%, then JPEG at quality 90. Phone photos of printed payslips are
//! usually low contrast with a colour cast; flattening to high-contrast gray
//! makes small digits easier for the vision model to read.
//!
//! Failure here is never fatal. If the pixels cannot be decoded, re-encoded,
//! or the caller reports that rendering is unavailable, the original bytes
//! are sent untouched and the reason is recorded as a [`FallbackReason`].

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use tracing::debug;

/// Contrast factor (CSS `contrast(160%)`).
pub const CONTRAST: f32 = 1.6;
/// Brightness factor (CSS `brightness(110%)`).
pub const BRIGHTNESS: f32 = 1.1;
/// JPEG quality of the enhanced output.
pub const JPEG_QUALITY: u8 = 90;

/// Whether the host can run the pixel filter at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderSupport {
    #[default]
    Available,
    Unavailable,
}

/// Why enhancement was skipped for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    RenderUnavailable,
    DecodeFailed(String),
    EncodeFailed(String),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::RenderUnavailable => write!(f, "rendering unavailable"),
            FallbackReason::DecodeFailed(e) => write!(f, "decode failed: {e}"),
            FallbackReason::EncodeFailed(e) => write!(f, "encode failed: {e}"),
        }
    }
}

/// What normalization did to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Enhancement {
    /// Filter ran; payload is the enhanced JPEG.
    Applied,
    /// Not an image (PDF passthrough).
    NotApplicable,
    /// Image sent as-is.
    Fallback(FallbackReason),
}

impl Enhancement {
    pub fn is_applied(&self) -> bool {
        matches!(self, Enhancement::Applied)
    }
}

/// Run the filter over encoded image bytes and return JPEG bytes.
pub fn enhance_image(bytes: &[u8], support: RenderSupport) -> Result<Vec<u8>, FallbackReason> {
    if support == RenderSupport::Unavailable {
        return Err(FallbackReason::RenderUnavailable);
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| FallbackReason::DecodeFailed(e.to_string()))?;
    debug!("Decoded image {}x{} for enhancement", img.width(), img.height());

    let filtered = apply_filter(&img);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&filtered)
        .map_err(|e| FallbackReason::EncodeFailed(e.to_string()))?;

    debug!("Enhanced image: {} → {} bytes", bytes.len(), out.len());
    Ok(out)
}

/// Grayscale, contrast, brightness, in that order.
pub fn apply_filter(img: &DynamicImage) -> GrayImage {
    let mut gray = img.to_luma8();
    for px in gray.pixels_mut() {
        px.0[0] = adjust(px.0[0]);
    }
    gray
}

/// One channel through contrast then brightness, on the 0–1 scale.
fn adjust(value: u8) -> u8 {
    let c = value as f32 / 255.0;
    let c = ((c - 0.5) * CONTRAST + 0.5).clamp(0.0, 1.0);
    let c = (c * BRIGHTNESS).clamp(0.0, 1.0);
    (c * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn adjust_midpoint_and_extremes() {
        // mid-gray is a contrast fixed point, then brightened by 10%
        assert_eq!(adjust(128), 141);
        assert_eq!(adjust(0), 0);
        assert_eq!(adjust(255), 255);
        // dark values are pushed to black
        assert_eq!(adjust(40), 0);
    }

    #[test]
    fn adjust_is_monotonic() {
        let mut prev = 0;
        for v in 0..=255u8 {
            let a = adjust(v);
            assert!(a >= prev, "adjust({v}) = {a} < {prev}");
            prev = a;
        }
    }

    #[test]
    fn filter_outputs_gray_with_same_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 3, Rgb([200, 30, 30])));
        let out = apply_filter(&img);
        assert_eq!(out.dimensions(), (7, 3));
    }

    #[test]
    fn enhance_png_produces_jpeg() {
        let bytes = png_bytes(RgbImage::from_pixel(16, 16, Rgb([120, 140, 160])));
        let out = enhance_image(&bytes, RenderSupport::Available).unwrap();
        assert_eq!(&out[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn unavailable_rendering_falls_back() {
        let bytes = png_bytes(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        assert_eq!(
            enhance_image(&bytes, RenderSupport::Unavailable),
            Err(FallbackReason::RenderUnavailable)
        );
    }

    #[test]
    fn garbage_bytes_fall_back_with_decode_reason() {
        let err = enhance_image(b"definitely not an image", RenderSupport::Available).unwrap_err();
        assert!(matches!(err, FallbackReason::DecodeFailed(_)), "got {err:?}");
    }

    #[test]
    fn enhancement_serialises_with_tag() {
        let v = serde_json::to_value(Enhancement::Fallback(FallbackReason::RenderUnavailable))
            .unwrap();
        assert_eq!(v["status"], "fallback");
        assert_eq!(v["reason"]["kind"], "render_unavailable");
        let v = serde_json::to_value(Enhancement::Applied).unwrap();
        assert_eq!(v["status"], "applied");
    }
}
