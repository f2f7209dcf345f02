//! Controller states.

use band_common::{BandIndex, BandMetadata, UploadedAsset};

use crate::decode::DecodedImage;
use crate::resources::ResourceHandle;
use crate::viewport::ViewportTransform;

/// The band image currently attached to the display.
#[derive(Debug)]
pub struct ActiveBandImage {
    pub band: BandIndex,
    pub label: String,
    pub handle: ResourceHandle,
    pub image: DecodedImage,
    pub viewport: ViewportTransform,
}

/// Lifecycle of one viewer session.
///
/// ```text
/// Empty -> Uploading -> MetadataLoading -> Ready(band)
///             |               |     \
///           Empty           Empty   NoBands
/// ```
#[derive(Debug, Default)]
pub enum ViewerState {
    #[default]
    Empty,
    Uploading {
        file_name: String,
    },
    MetadataLoading {
        asset: UploadedAsset,
    },
    /// The raster has no bands; nothing can be selected.
    NoBands {
        asset: UploadedAsset,
    },
    Ready {
        asset: UploadedAsset,
        metadata: BandMetadata,
        active: Option<ActiveBandImage>,
    },
}

impl ViewerState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerState::Empty => "empty",
            ViewerState::Uploading { .. } => "uploading",
            ViewerState::MetadataLoading { .. } => "metadata_loading",
            ViewerState::NoBands { .. } => "no_bands",
            ViewerState::Ready { .. } => "ready",
        }
    }

    pub fn asset(&self) -> Option<&UploadedAsset> {
        match self {
            ViewerState::MetadataLoading { asset }
            | ViewerState::NoBands { asset }
            | ViewerState::Ready { asset, .. } => Some(asset),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&BandMetadata> {
        match self {
            ViewerState::Ready { metadata, .. } => Some(metadata),
            _ => None,
        }
    }

    pub fn active(&self) -> Option<&ActiveBandImage> {
        match self {
            ViewerState::Ready { active, .. } => active.as_ref(),
            _ => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveBandImage> {
        match self {
            ViewerState::Ready { active, .. } => active.as_mut(),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewerState::Ready { .. })
    }
}
