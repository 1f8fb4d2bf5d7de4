use anyhow::{Context, Result};
use catalogdb_core::types::ImageInput;
use image::imageops::FilterType;

/// Decode PNG/JPEG/WebP bytes into an RGB8 pixel array.
pub fn decode_image(bytes: &[u8]) -> Result<ImageInput> {
    let img = image::load_from_memory(bytes).context("decoding image bytes")?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(ImageInput::new(width, height, rgb.into_raw())?)
}

/// Resize to a `size`x`size` square, returning raw RGB8 bytes.
pub fn resize_square(image: &ImageInput, size: u32) -> Result<Vec<u8>> {
    let rgb = image::RgbImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
        .context("pixel buffer does not match image dimensions")?;
    Ok(image::imageops::resize(&rgb, size, size, FilterType::Triangle).into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_produces_square_buffer() {
        let img = ImageInput::new(4, 2, vec![128; 4 * 2 * 3]).unwrap();
        let out = resize_square(&img, 3).unwrap();
        assert_eq!(out.len(), 3 * 3 * 3);
        assert!(out.iter().all(|&p| (127..=129).contains(&p)));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
