//! Backend trait and its HTTP implementation.

use async_trait::async_trait;
use band_common::{BandIndex, BandMetadata, UploadedAsset};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Body, Client, Response, Url};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::progress::ProgressTracker;

/// Mime type declared for uploaded rasters.
const TIFF_MIME: &str = "image/tiff";

/// Multipart field name expected by the upload endpoint.
const UPLOAD_FIELD: &str = "file";

/// Operations the viewer needs from the raster backend.
///
/// All requests are read-only except the upload, and every read is
/// idempotent, so callers may abandon a request by ignoring its result.
#[async_trait]
pub trait BandBackend: Send + Sync {
    /// Upload raster bytes, reporting progress through `progress`.
    async fn upload(
        &self,
        file_name: &str,
        bytes: Bytes,
        progress: ProgressTracker,
    ) -> ClientResult<UploadedAsset>;

    /// Fetch band count and descriptions for an uploaded raster.
    async fn metadata(&self, asset: &UploadedAsset) -> ClientResult<BandMetadata>;

    /// Fetch the rendered image of one band. Never returns an empty body.
    async fn band_image(&self, asset: &UploadedAsset, band: BandIndex) -> ClientResult<Bytes>;
}

/// [`BandBackend`] over HTTP.
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            config,
            base,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-2xx response into a [`ClientError::Server`].
    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ClientError::from_error_body(status, &body))
    }
}

/// Split a payload into chunks without copying.
fn chunk_bytes(bytes: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..bytes.len())
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(bytes.len())))
        .collect()
}

#[async_trait]
impl BandBackend for HttpBackend {
    #[instrument(skip(self, bytes, progress), fields(size = bytes.len()))]
    async fn upload(
        &self,
        file_name: &str,
        bytes: Bytes,
        progress: ProgressTracker,
    ) -> ClientResult<UploadedAsset> {
        let url = self.endpoint(&["api", "upload-geotiff"])?;
        let total = bytes.len() as u64;

        progress.start();
        let tracker = progress.clone();
        let chunks = chunk_bytes(&bytes, self.config.upload_chunk_size);
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            tracker.advance(chunk.len() as u64);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name.to_string())
            .mime_str(TIFF_MIME)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self.client.post(url).multipart(form).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;

        let asset: UploadedAsset = serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("upload response: {}", e)))?;

        progress.finish();
        info!(file_name = %file_name, token = %asset.filename, bytes = total, "Upload completed");
        Ok(asset)
    }

    #[instrument(skip(self, asset), fields(token = %asset.filename))]
    async fn metadata(&self, asset: &UploadedAsset) -> ClientResult<BandMetadata> {
        let url = self.endpoint(&["api", "geotiff-metadata", &asset.filename])?;
        let response = Self::check_status(self.client.get(url).send().await?).await?;
        let body = response.bytes().await?;

        let metadata: BandMetadata = serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("metadata response: {}", e)))?;
        debug!(bands = metadata.band_count, "Metadata received");
        Ok(metadata)
    }

    #[instrument(skip(self, asset, band), fields(token = %asset.filename, band = band.get()))]
    async fn band_image(&self, asset: &UploadedAsset, band: BandIndex) -> ClientResult<Bytes> {
        let band_segment = band.get().to_string();
        let url = self.endpoint(&["api", "geotiff-band", &asset.filename, &band_segment])?;
        let response = Self::check_status(self.client.get(url).send().await?).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = &content_type {
            if !ct.starts_with("image/") {
                warn!(content_type = %ct, "Band response is not declared as an image");
            }
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ClientError::EmptyPayload);
        }
        debug!(bytes = bytes.len(), content_type = ?content_type, "Band image received");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bytes() {
        let bytes = Bytes::from_static(b"abcdefghij");
        let chunks = chunk_bytes(&bytes, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[2][..], b"ij");
        assert!(chunk_bytes(&Bytes::new(), 4).is_empty());
        assert_eq!(chunk_bytes(&bytes, 0).len(), 10);
    }

    #[test]
    fn test_endpoint_encodes_token() {
        let backend =
            HttpBackend::new(ClientConfig::default().with_base_url("http://localhost:8000/"))
                .unwrap();
        let url = backend
            .endpoint(&["api", "geotiff-metadata", "my scene#1.tif"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/geotiff-metadata/my%20scene%231.tif"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend =
            HttpBackend::new(ClientConfig::default().with_base_url("http://proxy/viewer"))
                .unwrap();
        let url = backend.endpoint(&["api", "upload-geotiff"]).unwrap();
        assert_eq!(url.as_str(), "http://proxy/viewer/api/upload-geotiff");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpBackend::new(ClientConfig::default().with_base_url("not a url"));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
