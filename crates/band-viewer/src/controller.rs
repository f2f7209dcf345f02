//! The band viewer controller.
//!
//! Each network step is split in three parts so callers can interleave them:
//! `begin_*` validates and records the request, `*_request` returns a
//! `'static` future that performs the I/O, and `finish_*`/`complete_band`
//! applies the result. Results are matched against the controller's current
//! upload epoch and band generation; anything that no longer matches is
//! discarded.

use std::future::Future;
use std::sync::Arc;

use band_client::{BandBackend, ClientError, ClientResult, ProgressSink, ProgressTracker};
use band_common::{
    validate_upload_name, BandIndex, BandMetadata, ImageFailure, UploadedAsset, ViewerError,
    ViewerResult,
};
use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::decode::{ImageDecoder, RasterDecoder};
use crate::resources::ResourceRegistry;
use crate::state::{ActiveBandImage, ViewerState};
use crate::status::ViewerStatus;
use crate::viewport::{ViewportLimits, ViewportTransform};

/// An upload accepted by [`BandViewerController::begin_upload`].
#[derive(Debug, Clone)]
pub struct UploadTicket {
    epoch: u64,
    file_name: String,
}

impl UploadTicket {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// A metadata fetch for the current asset.
#[derive(Debug, Clone)]
pub struct MetadataTicket {
    epoch: u64,
    asset: UploadedAsset,
}

/// A band request issued by [`BandViewerController::request_band`].
#[derive(Debug, Clone)]
pub struct BandTicket {
    epoch: u64,
    generation: u64,
    band: BandIndex,
    label: String,
    asset: UploadedAsset,
}

impl BandTicket {
    pub fn band(&self) -> BandIndex {
        self.band
    }

    /// Monotonic request number; the highest one issued is the only one
    /// allowed to reach the display.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// What happened to a completed band request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandOutcome {
    /// The image is now displayed.
    Applied { band: BandIndex },
    /// A newer request superseded this one; its payload was released.
    Discarded { band: BandIndex, generation: u64 },
}

/// Owns one viewer session: current asset, metadata, displayed band and
/// viewport. Not shared; all access goes through `&mut self`.
pub struct BandViewerController<B, D = RasterDecoder> {
    backend: Arc<B>,
    decoder: D,
    resources: ResourceRegistry,
    limits: ViewportLimits,
    state: ViewerState,
    status: ViewerStatus,
    /// Bumped on every reset; results from older epochs are ignored.
    epoch: u64,
    /// Bumped on every band request.
    generation: u64,
    /// Generation allowed to update the display, if a request is pending.
    latest_band: Option<u64>,
    mounted: bool,
}

impl<B: BandBackend + 'static> BandViewerController<B, RasterDecoder> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_decoder(backend, RasterDecoder)
    }
}

impl<B, D> BandViewerController<B, D>
where
    B: BandBackend + 'static,
    D: ImageDecoder,
{
    pub fn with_decoder(backend: Arc<B>, decoder: D) -> Self {
        Self {
            backend,
            decoder,
            resources: ResourceRegistry::new(),
            limits: ViewportLimits::default(),
            state: ViewerState::Empty,
            status: ViewerStatus::default(),
            epoch: 0,
            generation: 0,
            latest_band: None,
            mounted: true,
        }
    }

    pub fn with_viewport_limits(mut self, limits: ViewportLimits) -> Self {
        self.limits = limits;
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a fresh session.
    pub fn mount(&mut self) {
        self.reset();
        self.mounted = true;
        debug!("Viewer mounted");
    }

    /// Tear the session down, releasing the displayed image.
    pub fn unmount(&mut self) {
        self.reset();
        self.mounted = false;
        debug!(live_resources = self.resources.live(), "Viewer unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Drop asset, metadata, image and viewport; invalidate pending results.
    pub fn reset(&mut self) {
        self.state = ViewerState::Empty;
        self.status = ViewerStatus::default();
        self.epoch += 1;
        self.latest_band = None;
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Accept a new upload. Any previous session state is discarded first.
    pub fn begin_upload(&mut self, file_name: &str) -> ViewerResult<UploadTicket> {
        validate_upload_name(file_name)?;

        self.reset();
        self.state = ViewerState::Uploading {
            file_name: file_name.to_string(),
        };
        self.status.uploading(file_name);
        counter!("band_viewer_uploads_total").increment(1);
        info!(file_name = %file_name, epoch = self.epoch, "Upload started");

        Ok(UploadTicket {
            epoch: self.epoch,
            file_name: file_name.to_string(),
        })
    }

    /// The transfer for an accepted upload.
    pub fn upload_request(
        &self,
        ticket: &UploadTicket,
        bytes: Bytes,
        progress: Option<ProgressSink>,
    ) -> impl Future<Output = ClientResult<UploadedAsset>> + Send + 'static {
        let backend = self.backend.clone();
        let file_name = ticket.file_name.clone();
        let total = bytes.len() as u64;
        let tracker = match progress {
            Some(sink) => ProgressTracker::new(total, sink),
            None => ProgressTracker::silent(total),
        };
        async move { backend.upload(&file_name, bytes, tracker).await }
    }

    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: ClientResult<UploadedAsset>,
    ) -> ViewerResult<UploadedAsset> {
        if ticket.epoch != self.epoch {
            debug!(file_name = %ticket.file_name, "Ignoring result of superseded upload");
            return Err(ViewerError::StaleAsset(ticket.file_name));
        }

        match result {
            Ok(asset) => {
                self.status.analyzing(&asset.filename);
                self.state = ViewerState::MetadataLoading {
                    asset: asset.clone(),
                };
                Ok(asset)
            }
            Err(e) => {
                counter!("band_viewer_upload_failures_total").increment(1);
                Err(self.fail(ViewerError::TransferFailed(e.to_string())))
            }
        }
    }

    /// Upload a raster and wait for the server's token.
    pub async fn submit_upload(
        &mut self,
        file_name: &str,
        bytes: Bytes,
        progress: Option<ProgressSink>,
    ) -> ViewerResult<UploadedAsset> {
        let ticket = self.begin_upload(file_name)?;
        let result = self.upload_request(&ticket, bytes, progress).await;
        self.finish_upload(ticket, result)
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Check that `asset` is the upload awaiting metadata.
    pub fn begin_metadata(&self, asset: &UploadedAsset) -> ViewerResult<MetadataTicket> {
        if self.state.asset() != Some(asset) {
            return Err(ViewerError::StaleAsset(asset.filename.clone()));
        }
        if !matches!(self.state, ViewerState::MetadataLoading { .. }) {
            return Err(ViewerError::NotReady(self.state.name()));
        }
        Ok(MetadataTicket {
            epoch: self.epoch,
            asset: asset.clone(),
        })
    }

    pub fn metadata_request(
        &self,
        ticket: &MetadataTicket,
    ) -> impl Future<Output = ClientResult<BandMetadata>> + Send + 'static {
        let backend = self.backend.clone();
        let asset = ticket.asset.clone();
        async move { backend.metadata(&asset).await }
    }

    pub fn finish_metadata(
        &mut self,
        ticket: MetadataTicket,
        result: ClientResult<BandMetadata>,
    ) -> ViewerResult<BandMetadata> {
        if ticket.epoch != self.epoch {
            debug!(token = %ticket.asset, "Ignoring metadata for superseded upload");
            return Err(ViewerError::StaleAsset(ticket.asset.filename));
        }

        let checked = result
            .map_err(|e| ViewerError::MetadataUnavailable(e.to_string()))
            .and_then(|metadata| metadata.validate().map(|_| metadata));
        let metadata = match checked {
            Ok(metadata) => metadata,
            Err(err) => return Err(self.fail(err)),
        };

        let asset = ticket.asset;
        if metadata.is_empty() {
            let err = ViewerError::NoBands(asset.filename.clone());
            warn!(token = %asset, "Raster has no bands");
            self.status.report(&err);
            self.state = ViewerState::NoBands { asset };
            return Err(err);
        }

        info!(token = %asset, bands = metadata.band_count, "Band metadata loaded");
        self.status.idle();
        self.state = ViewerState::Ready {
            asset,
            metadata: metadata.clone(),
            active: None,
        };
        Ok(metadata)
    }

    /// Fetch band metadata for the current upload.
    pub async fn load_metadata(&mut self, asset: &UploadedAsset) -> ViewerResult<BandMetadata> {
        let ticket = self.begin_metadata(asset)?;
        let result = self.metadata_request(&ticket).await;
        self.finish_metadata(ticket, result)
    }

    // ========================================================================
    // Band images
    // ========================================================================

    /// Register a band request. Out-of-range indices are rejected here,
    /// before any I/O. The returned ticket supersedes all earlier ones.
    pub fn request_band(&mut self, index: u32) -> ViewerResult<BandTicket> {
        let (asset, metadata) = match &self.state {
            ViewerState::Ready {
                asset, metadata, ..
            } => (asset, metadata),
            other => return Err(ViewerError::NotReady(other.name())),
        };
        let band = metadata.band(index)?;
        let label = metadata.label(band, &asset.filename);
        let asset = asset.clone();

        self.generation += 1;
        self.latest_band = Some(self.generation);
        self.status.processing(&label);
        counter!("band_viewer_band_requests_total").increment(1);
        debug!(band = band.get(), generation = self.generation, label = %label, "Band requested");

        Ok(BandTicket {
            epoch: self.epoch,
            generation: self.generation,
            band,
            label,
            asset,
        })
    }

    pub fn band_request(
        &self,
        ticket: &BandTicket,
    ) -> impl Future<Output = ClientResult<Bytes>> + Send + 'static {
        let backend = self.backend.clone();
        let asset = ticket.asset.clone();
        let band = ticket.band;
        async move { backend.band_image(&asset, band).await }
    }

    /// Apply the result of a band request.
    ///
    /// Superseded results are released without touching the display. For the
    /// current request the new image must decode before it replaces the old
    /// one; on failure the old image stays up and a notice is shown.
    pub fn complete_band(
        &mut self,
        ticket: BandTicket,
        result: ClientResult<Bytes>,
    ) -> ViewerResult<BandOutcome> {
        let band = ticket.band;
        let arrived = result.map(|bytes| self.resources.acquire(bytes));

        let current = ticket.epoch == self.epoch && self.latest_band == Some(ticket.generation);
        if !current {
            drop(arrived);
            counter!("band_viewer_band_stale_discards_total").increment(1);
            debug!(
                band = band.get(),
                generation = ticket.generation,
                latest = ?self.latest_band,
                "Discarding superseded band result"
            );
            return Ok(BandOutcome::Discarded {
                band,
                generation: ticket.generation,
            });
        }
        self.latest_band = None;

        let handle = match arrived {
            Ok(handle) if handle.is_empty() => {
                return Err(self.band_failed(band, ImageFailure::EmptyPayload))
            }
            Ok(handle) => handle,
            Err(ClientError::EmptyPayload) => {
                return Err(self.band_failed(band, ImageFailure::EmptyPayload))
            }
            Err(e) => return Err(self.band_failed(band, ImageFailure::Fetch(e.to_string()))),
        };

        let image = match self.decoder.decode(handle.bytes()) {
            Ok(image) => image,
            Err(cause) => {
                drop(handle);
                return Err(self.band_failed(band, ImageFailure::Decode(cause)));
            }
        };

        let label = ticket.label;
        let installed = ActiveBandImage {
            band,
            label: label.clone(),
            handle,
            image,
            viewport: ViewportTransform::new(self.limits),
        };

        let previous = match &mut self.state {
            ViewerState::Ready { active, .. } => active.replace(installed),
            other => return Err(ViewerError::NotReady(other.name())),
        };
        self.status.showing(&label);
        info!(
            band = band.get(),
            label = %label,
            replaced = ?previous.as_ref().map(|p| p.band.get()),
            "Band image displayed"
        );
        drop(previous);

        Ok(BandOutcome::Applied { band })
    }

    /// Request a band and apply the response.
    pub async fn select_band(&mut self, index: u32) -> ViewerResult<BandOutcome> {
        let ticket = self.request_band(index)?;
        let result = self.band_request(&ticket).await;
        self.complete_band(ticket, result)
    }

    /// Upload a raster, load its metadata and show the first band.
    ///
    /// A failure on the first band leaves the viewer ready with an inline
    /// notice, so it is not returned as an error.
    pub async fn open(
        &mut self,
        file_name: &str,
        bytes: Bytes,
        progress: Option<ProgressSink>,
    ) -> ViewerResult<BandMetadata> {
        let asset = self.submit_upload(file_name, bytes, progress).await?;
        let metadata = self.load_metadata(&asset).await?;
        match self.select_band(1).await {
            Ok(_) | Err(ViewerError::ImageLoadFailed { .. }) => Ok(metadata),
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    pub fn asset(&self) -> Option<&UploadedAsset> {
        self.state.asset()
    }

    pub fn metadata(&self) -> Option<&BandMetadata> {
        self.state.metadata()
    }

    pub fn active(&self) -> Option<&ActiveBandImage> {
        self.state.active()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportTransform> {
        self.state.active_mut().map(|active| &mut active.viewport)
    }

    /// Labels for every band of the current raster.
    pub fn band_labels(&self) -> Vec<String> {
        match &self.state {
            ViewerState::Ready {
                asset, metadata, ..
            } => metadata.labels(&asset.filename),
            _ => Vec::new(),
        }
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Whether a band request is waiting for its result.
    pub fn band_pending(&self) -> bool {
        self.latest_band.is_some()
    }

    fn band_failed(&mut self, band: BandIndex, failure: ImageFailure) -> ViewerError {
        counter!("band_viewer_band_failures_total").increment(1);
        self.fail(ViewerError::ImageLoadFailed {
            band: band.get(),
            failure,
        })
    }

    fn fail(&mut self, err: ViewerError) -> ViewerError {
        warn!(error = %err, state = self.state.name(), "Viewer operation failed");
        if err.resets_viewer() {
            self.reset();
        }
        self.status.report(&err);
        err
    }
}
