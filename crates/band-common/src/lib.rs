//! Common types shared by the band viewer crates.

pub mod asset;
pub mod error;
pub mod metadata;
pub mod naming;

pub use asset::{validate_upload_name, BandIndex, UploadedAsset};
pub use error::{ImageFailure, ViewerError, ViewerResult};
pub use metadata::BandMetadata;
pub use naming::band_label;
