//! Common test fixtures for band viewer tests.

use std::io::Cursor;

use band_common::BandMetadata;
use bytes::Bytes;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};

/// File names that exercise the band label heuristic.
pub mod names {
    /// Sentinel-2 export with bands B8, B4, B3 in that order
    pub const SENTINEL2_B843: &str = "sentinel2_b843_2024-05-01.tif";

    /// Ordinary raster with no naming convention
    pub const PLAIN: &str = "scene.tif";

    /// Rejected by the upload name check
    pub const NOT_A_RASTER: &str = "scene.png";
}

/// Encode a uniform grayscale PNG.
pub fn png_bytes(width: u32, height: u32, value: u8) -> Bytes {
    let img = GrayImage::from_pixel(width, height, Luma([value]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("PNG encoding of an in-memory image cannot fail");
    Bytes::from(buf.into_inner())
}

/// The image a backend renders for `band`: 8x6, shade depends on the band.
pub fn band_png(band: u32) -> Bytes {
    png_bytes(8, 6, (band.wrapping_mul(40) % 256) as u8)
}

/// Deterministic stand-in for GeoTIFF file contents.
pub fn raster_payload(len: usize) -> Bytes {
    let mut data = Vec::with_capacity(len);
    data.extend((0..len).map(|i| (i % 251) as u8));
    Bytes::from(data)
}

/// Metadata with one band per description.
pub fn metadata(descriptions: &[&str]) -> BandMetadata {
    BandMetadata::new(descriptions.iter().map(|d| d.to_string()).collect())
}

/// Typical three-band description set.
pub fn rgb_metadata() -> BandMetadata {
    metadata(&["red", "green", "blue"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_is_png() {
        let bytes = png_bytes(2, 2, 7);
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_band_pngs_differ() {
        assert_ne!(band_png(1), band_png(2));
    }

    #[test]
    fn test_raster_payload_len() {
        assert_eq!(raster_payload(1000).len(), 1000);
        assert!(raster_payload(0).is_empty());
    }

    #[test]
    fn test_metadata_counts() {
        assert_eq!(rgb_metadata().band_count, 3);
        assert!(metadata(&[]).is_empty());
    }
}
