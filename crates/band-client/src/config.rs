//! Client configuration.

use std::time::Duration;

/// Configuration for [`HttpBackend`](crate::HttpBackend).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Whole-request timeout (uploads of large rasters need a generous value)
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Upload body chunk size; one progress event is emitted per chunk
    pub upload_chunk_size: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(30),
            upload_chunk_size: 64 * 1024, // 64KB
            user_agent: format!("band-viewer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_upload_chunk_size(mut self, chunk_size: usize) -> Self {
        self.upload_chunk_size = chunk_size;
        self
    }
}
