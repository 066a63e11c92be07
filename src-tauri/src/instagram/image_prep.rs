//! Avatar downsizing and `data:` URL encoding.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Avatars are rendered at 48px; 128 leaves room for HiDPI.
pub const MAX_AVATAR_DIMENSION: u32 = 128;

/// Encode downloaded avatar bytes as a `data:` URL.
///
/// Decodable images are shrunk to [`MAX_AVATAR_DIMENSION`] and re-encoded as
/// JPEG. Anything else is passed through under its original content type.
pub fn avatar_data_url(bytes: &[u8], content_type: Option<&str>) -> String {
    match shrink_to_jpeg(bytes) {
        Ok(jpeg) => format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)),
        Err(e) => {
            debug!("Passing avatar through unmodified: {}", e);
            let mime = content_type
                .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
                .filter(|ct| ct.starts_with("image/"))
                .unwrap_or("image/jpeg");
            format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
        }
    }
}

fn shrink_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("Failed to load image: {}", e))?;
    let resized = resize_if_needed(img, MAX_AVATAR_DIMENSION);
    encode_to_jpeg(&resized)
}

/// Fit within `max_dimension` on both sides, keeping the aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
}

fn encode_to_jpeg(img: &DynamicImage) -> Result<Vec<u8>, String> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode image to JPEG: {}", e))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgba8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn decode_data_url(url: &str) -> DynamicImage {
        let b64 = url.split_once(',').unwrap().1;
        image::load_from_memory(&STANDARD.decode(b64).unwrap()).unwrap()
    }

    #[test]
    fn test_large_avatar_is_shrunk_to_jpeg() {
        let url = avatar_data_url(&png(320, 160), Some("image/png"));
        assert!(url.starts_with("data:image/jpeg;base64,"));
        let img = decode_data_url(&url);
        assert_eq!(img.width(), 128);
        assert!(img.height() <= 128);
    }

    #[test]
    fn test_small_avatar_keeps_size() {
        let img = decode_data_url(&avatar_data_url(&png(64, 64), None));
        assert_eq!((img.width(), img.height()), (64, 64));
    }

    #[test]
    fn test_undecodable_bytes_pass_through() {
        let url = avatar_data_url(b"not an image", Some("image/heic; charset=binary"));
        assert_eq!(url, format!("data:image/heic;base64,{}", STANDARD.encode(b"not an image")));
    }

    #[test]
    fn test_non_image_content_type_defaults_to_jpeg() {
        let url = avatar_data_url(b"xx", Some("text/html"));
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
