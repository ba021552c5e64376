use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{EditorError, Result};

/// Media type of everything the editor exports: lossless and alpha-preserving.
pub const EXPORT_MIME: &str = "image/png";

// ============================================================================
// DECODING
// ============================================================================

/// Decode any format the `image` crate was built with (PNG, JPEG, WEBP, BMP)
/// into straight-alpha RGBA at its natural size.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(e) => {
            log_warn!("Image decode failed ({} bytes): {}", bytes.len(), e);
            Err(e.into())
        }
    }
}

pub fn load_image_path(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

/// Decode a `data:<mime>;base64,<payload>` URI.  Only base64 payloads are
/// accepted; the media type is not trusted, the bytes are sniffed.
pub fn decode_data_uri(uri: &str) -> Result<RgbaImage> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EditorError::InvalidDataUri("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| EditorError::InvalidDataUri("missing ',' separator".into()))?;
    if !header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(EditorError::InvalidDataUri(format!(
            "unsupported encoding in '{}'",
            header
        )));
    }
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| EditorError::InvalidDataUri(e.to_string()))?;
    decode_image(&bytes)
}

/// Resolve an image source handed over by the host: a `data:` URI or a local
/// file path (with or without a `file://` prefix).
pub fn load_image_source(source: &str) -> Result<RgbaImage> {
    let source = source.trim();
    if source.starts_with("data:") {
        return decode_data_uri(source);
    }
    let path = source.strip_prefix("file://").unwrap_or(source);
    load_image_path(Path::new(path))
}

// ============================================================================
// ENCODING
// ============================================================================

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| EditorError::Encode(e.to_string()))?;
    Ok(out)
}

/// PNG-encode and wrap as `data:image/png;base64,...`.
pub fn to_data_uri(image: &RgbaImage) -> Result<String> {
    let png = encode_png(image)?;
    Ok(format!("data:{};base64,{}", EXPORT_MIME, BASE64.encode(png)))
}

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| EditorError::Encode(e.to_string()))?;
    log_info!(
        "Wrote {}x{} PNG to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}
