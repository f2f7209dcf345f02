//! Uploaded raster assets and band indices.

use serde::{Deserialize, Serialize};

use crate::error::{ViewerError, ViewerResult};

/// Extensions accepted by the upload endpoint.
const RASTER_EXTENSIONS: [&str; 2] = [".tif", ".tiff"];

/// Server-assigned handle for an uploaded raster.
///
/// The token is opaque; it is only ever echoed back in follow-up requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub filename: String,
}

impl UploadedAsset {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

impl std::fmt::Display for UploadedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filename)
    }
}

/// A 1-based band index known to be within `1..=band_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandIndex(u32);

impl BandIndex {
    /// Validate `index` against the number of bands in the file.
    pub fn new(index: u32, band_count: u32) -> ViewerResult<Self> {
        if index == 0 || index > band_count {
            return Err(ViewerError::BandOutOfRange {
                index,
                count: band_count,
            });
        }
        Ok(Self(index))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Position of this band in a 0-based description list.
    pub fn position(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for BandIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check a user-supplied file name before uploading it.
pub fn validate_upload_name(name: &str) -> ViewerResult<()> {
    let lower = name.to_lowercase();
    let stem_len = RASTER_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| lower.len() - ext.len());

    match stem_len {
        Some(len) if len > 0 => Ok(()),
        _ => Err(ViewerError::UnsupportedFile(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_index_bounds() {
        assert!(BandIndex::new(1, 3).is_ok());
        assert!(BandIndex::new(3, 3).is_ok());
        assert_eq!(
            BandIndex::new(0, 3),
            Err(ViewerError::BandOutOfRange { index: 0, count: 3 })
        );
        assert_eq!(
            BandIndex::new(4, 3),
            Err(ViewerError::BandOutOfRange { index: 4, count: 3 })
        );
        assert!(BandIndex::new(1, 0).is_err());
    }

    #[test]
    fn test_band_index_position() {
        assert_eq!(BandIndex::new(1, 4).unwrap().position(), 0);
        assert_eq!(BandIndex::new(4, 4).unwrap().position(), 3);
    }

    #[test]
    fn test_upload_name() {
        assert!(validate_upload_name("scene.tif").is_ok());
        assert!(validate_upload_name("SCENE.TIFF").is_ok());
        assert!(validate_upload_name("scene.png").is_err());
        assert!(validate_upload_name(".tif").is_err());
        assert!(validate_upload_name("").is_err());
    }

    #[test]
    fn test_asset_from_upload_response() {
        let asset: UploadedAsset =
            serde_json::from_str(r#"{"filename":"a.tif","detail":"Archivo subido con éxito"}"#)
                .unwrap();
        assert_eq!(asset, UploadedAsset::new("a.tif"));
    }
}
