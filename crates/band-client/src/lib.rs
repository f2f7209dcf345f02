//! Client for the GeoTIFF band backend.
//!
//! The backend exposes three endpoints:
//! - `POST /api/upload-geotiff` (multipart `file`) returning `{ "filename": ... }`
//! - `GET /api/geotiff-metadata/{filename}` returning `{ "bands": n, "descriptions": [...] }`
//! - `GET /api/geotiff-band/{filename}/{band}` returning the rendered band image
//!
//! Errors are reported by the server as `{ "detail": ... }`.

pub mod backend;
pub mod config;
pub mod error;
pub mod progress;

pub use backend::{BandBackend, HttpBackend};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use progress::{ProgressSink, ProgressTracker, UploadProgress};
