//! Texture decoding and encoding.

use crate::error::{ConvertError, Result};
use crate::slpk::TextureStream;
use image::{ImageEncoder, ImageFormat, RgbImage};

/// JPEG quality of rebuilt atlases.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Decode a texture to RGB pixels.
pub fn decode_texture(stream: &TextureStream) -> Result<RgbImage> {
    let img = image::load_from_memory(&stream.bytes).map_err(|e| {
        ConvertError::decode(&stream.path, format!("cannot decode image: {}", e))
    })?;
    Ok(img.to_rgb8())
}

/// Encode an RGB raster as JPEG bytes.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);

    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(bytes)
}

/// File extension matching the encoded image format, `bin` when unknown.
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(format) => format.extensions_str().first().copied().unwrap_or("bin"),
        Err(_) => "bin",
    }
}
