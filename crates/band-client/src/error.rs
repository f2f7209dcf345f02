//! Transport-level errors.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response; `detail` comes from the `{ "detail": ... }` body.
    #[error("{detail} (HTTP {status})")]
    Server { status: u16, detail: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// 2xx response with a zero-byte body.
    #[error("server returned an empty body")]
    EmptyPayload,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Build a server error from a status code and raw error body.
    ///
    /// FastAPI-style bodies carry `detail` as a string, or as a list of
    /// validation errors; anything unparsable falls back to the status text.
    pub fn from_error_body(status: reqwest::StatusCode, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| value.get("detail").cloned())
            .map(|detail| match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            });

        ClientError::Server {
            status: status.as_u16(),
            detail,
        }
    }

    /// HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
