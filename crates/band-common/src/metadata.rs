//! Band metadata as reported by the metadata endpoint.

use serde::{Deserialize, Serialize};

use crate::asset::BandIndex;
use crate::error::{ViewerError, ViewerResult};
use crate::naming::band_label;

/// Band layout of an uploaded raster.
///
/// Immutable once fetched. Band `i` on the wire maps to `descriptions[i - 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandMetadata {
    #[serde(rename = "bands")]
    pub band_count: u32,

    #[serde(default)]
    pub descriptions: Vec<String>,

    /// Raster width in pixels (full resolution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Raster height in pixels (full resolution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl BandMetadata {
    pub fn new(descriptions: Vec<String>) -> Self {
        Self {
            band_count: descriptions.len() as u32,
            descriptions,
            width: None,
            height: None,
        }
    }

    /// Parse and validate a metadata response body.
    pub fn from_json(body: &[u8]) -> ViewerResult<Self> {
        let metadata: BandMetadata = serde_json::from_slice(body)
            .map_err(|e| ViewerError::MetadataUnavailable(format!("invalid response: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Check that the description list matches the band count.
    pub fn validate(&self) -> ViewerResult<()> {
        if self.descriptions.len() != self.band_count as usize {
            return Err(ViewerError::MetadataUnavailable(format!(
                "{} descriptions for {} bands",
                self.descriptions.len(),
                self.band_count
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.band_count == 0
    }

    /// Validate a 1-based band index against this file.
    pub fn band(&self, index: u32) -> ViewerResult<BandIndex> {
        BandIndex::new(index, self.band_count)
    }

    pub fn description(&self, band: BandIndex) -> &str {
        self.descriptions
            .get(band.position())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Display label for one band.
    pub fn label(&self, band: BandIndex, filename: &str) -> String {
        band_label(self.description(band), band.get(), filename)
    }

    /// Display labels for all bands, in band order.
    pub fn labels(&self, filename: &str) -> Vec<String> {
        self.descriptions
            .iter()
            .enumerate()
            .map(|(i, desc)| band_label(desc, i as u32 + 1, filename))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_response() {
        let body = br#"{"bands":3,"descriptions":["B8","B4","B3"],"width":1024,"height":768}"#;
        let metadata = BandMetadata::from_json(body).unwrap();
        assert_eq!(metadata.band_count, 3);
        assert_eq!(metadata.width, Some(1024));
        assert_eq!(metadata.description(metadata.band(2).unwrap()), "B4");
    }

    #[test]
    fn test_parse_without_dimensions() {
        let metadata = BandMetadata::from_json(br#"{"bands":1,"descriptions":["x"]}"#).unwrap();
        assert_eq!(metadata.width, None);
        assert_eq!(metadata.height, None);
    }

    #[test]
    fn test_zero_bands_is_valid_but_empty() {
        let metadata = BandMetadata::from_json(br#"{"bands":0,"descriptions":[]}"#).unwrap();
        assert!(metadata.is_empty());
        assert!(metadata.band(1).is_err());
    }

    #[test]
    fn test_mismatched_descriptions_rejected() {
        let err = BandMetadata::from_json(br#"{"bands":2,"descriptions":["a"]}"#).unwrap_err();
        assert!(matches!(err, ViewerError::MetadataUnavailable(_)));
    }

    #[test]
    fn test_negative_band_count_rejected() {
        let err = BandMetadata::from_json(br#"{"bands":-1,"descriptions":[]}"#).unwrap_err();
        assert!(matches!(err, ViewerError::MetadataUnavailable(_)));
    }

    #[test]
    fn test_labels() {
        let metadata = BandMetadata::new(vec!["Red".into(), "".into(), "SWIR".into()]);
        assert_eq!(metadata.labels("scene.tif"), vec!["Roja", "Banda 2", "SWIR"]);
    }
}
