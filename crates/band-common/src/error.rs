//! Error types for the band viewer.

use thiserror::Error;

/// Result type alias using ViewerError.
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Why a band image could not be shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageFailure {
    /// The request failed or the server answered with an error.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The server answered 2xx with a zero-byte body.
    #[error("server returned an empty image (0 bytes)")]
    EmptyPayload,

    /// Bytes arrived but could not be decoded as an image.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Primary error type for viewer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    // === Upload ===
    #[error("Upload failed: {0}")]
    TransferFailed(String),

    #[error("Unsupported file: {0} (expected .tif or .tiff)")]
    UnsupportedFile(String),

    // === Metadata ===
    #[error("Band metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("File '{0}' contains no image bands")]
    NoBands(String),

    // === Band images ===
    #[error("Failed to load band {band}: {failure}")]
    ImageLoadFailed { band: u32, failure: ImageFailure },

    // === Preconditions ===
    #[error("Band index {index} out of range 1..={count}")]
    BandOutOfRange { index: u32, count: u32 },

    #[error("Asset '{0}' is not the current upload")]
    StaleAsset(String),

    #[error("Viewer is not ready (state: {0})")]
    NotReady(&'static str),
}

impl ViewerError {
    /// Whether this error sends the controller back to the empty state.
    pub fn resets_viewer(&self) -> bool {
        matches!(
            self,
            ViewerError::TransferFailed(_)
                | ViewerError::MetadataUnavailable(_)
        )
    }

    /// Whether this error is a caller mistake detected before any I/O.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ViewerError::BandOutOfRange { .. }
                | ViewerError::StaleAsset(_)
                | ViewerError::NotReady(_)
                | ViewerError::UnsupportedFile(_)
        )
    }

    /// Message for the viewer's status area.
    ///
    /// Fetch and decode failures are worded differently so the user can tell
    /// a server problem from an image the viewer could not render.
    pub fn user_message(&self) -> String {
        match self {
            ViewerError::TransferFailed(cause) => format!("Fallo en la subida: {}", cause),
            ViewerError::UnsupportedFile(_) => {
                "Error: El archivo no es un .tif o .tiff válido.".to_string()
            }
            ViewerError::MetadataUnavailable(cause) => {
                format!("Error de inicialización: {}", cause)
            }
            ViewerError::NoBands(_) => "El archivo no contiene bandas de imagen.".to_string(),
            ViewerError::ImageLoadFailed { band, failure } => match failure {
                ImageFailure::Fetch(cause) => {
                    format!("Error al solicitar la banda {}: {}", band, cause)
                }
                ImageFailure::EmptyPayload => format!(
                    "Error al solicitar la banda {}: el servidor ha devuelto una imagen vacía (0 bytes).",
                    band
                ),
                ImageFailure::Decode(_) => format!(
                    "Fallo al cargar la banda {}: no se pudo decodificar la imagen recibida del servidor.",
                    band
                ),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_classes() {
        assert!(ViewerError::TransferFailed("x".into()).resets_viewer());
        assert!(ViewerError::MetadataUnavailable("x".into()).resets_viewer());
        assert!(!ViewerError::NoBands("a.tif".into()).resets_viewer());
        assert!(!ViewerError::ImageLoadFailed {
            band: 1,
            failure: ImageFailure::EmptyPayload
        }
        .resets_viewer());
    }

    #[test]
    fn test_fetch_and_decode_messages_differ() {
        let fetch = ViewerError::ImageLoadFailed {
            band: 2,
            failure: ImageFailure::Fetch("HTTP 500".into()),
        };
        let decode = ViewerError::ImageLoadFailed {
            band: 2,
            failure: ImageFailure::Decode("bad header".into()),
        };
        assert!(fetch.user_message().contains("solicitar"));
        assert!(decode.user_message().contains("decodificar"));
        assert_ne!(fetch.user_message(), decode.user_message());
    }

    #[test]
    fn test_precondition_errors() {
        assert!(ViewerError::BandOutOfRange { index: 0, count: 3 }.is_precondition());
        assert!(ViewerError::NotReady("empty").is_precondition());
        assert!(!ViewerError::TransferFailed("x".into()).is_precondition());
    }
}
