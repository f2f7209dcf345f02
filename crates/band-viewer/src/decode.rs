//! Client-side decoding of band images.
//!
//! A fetched payload only replaces the displayed image once it decodes, so a
//! corrupt response never blanks the viewer.

use image::{DynamicImage, GenericImageView, ImageFormat};

/// Something that can turn payload bytes into a displayable image.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, String>;
}

/// A decoded band image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub image: DynamicImage,
}

/// Decoder backed by the `image` crate (PNG, JPEG, WebP, TIFF...).
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, String> {
        let format = image::guess_format(bytes).map_err(|e| e.to_string())?;
        let image = image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("image has no pixels ({}x{})", width, height));
        }
        Ok(DecodedImage {
            width,
            height,
            format,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(width, height, image::Luma([128u8]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let decoded = RasterDecoder.decode(&png(4, 3)).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(RasterDecoder.decode(b"definitely not an image").is_err());
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = png(16, 16);
        assert!(RasterDecoder.decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
