//! Band viewer controller.
//!
//! Drives the cycle "upload a raster, fetch its band metadata, request one
//! rendered band image at a time, display it". Only the most recently
//! requested band may reach the display; older results are released on
//! arrival without being attached.
//!
//! [`BandViewerController`] is the single-owner state machine.
//! [`ViewerSession`] runs one controller on its own tokio task and lets a UI
//! issue overlapping requests through a [`ViewerHandle`].

pub mod controller;
pub mod decode;
pub mod resources;
pub mod session;
pub mod state;
pub mod status;
pub mod viewport;

pub use controller::{BandOutcome, BandTicket, BandViewerController, MetadataTicket, UploadTicket};
pub use decode::{DecodedImage, ImageDecoder, RasterDecoder};
pub use resources::{ResourceHandle, ResourceRegistry};
pub use session::{SessionError, ViewerEvent, ViewerHandle, ViewerSession, ViewerSnapshot};
pub use state::{ActiveBandImage, ViewerState};
pub use status::{Notice, NoticeLevel, ViewerStatus};
pub use viewport::{ViewportLimits, ViewportTransform};
