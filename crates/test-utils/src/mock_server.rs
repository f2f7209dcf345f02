//! HTTP mock of the raster backend.
//!
//! Serves the upload, metadata and band endpoints on an ephemeral local
//! port. Every uploaded `.tif`/`.tiff` file gets the band layout the server
//! was started with; band images are small PNGs unless overridden.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::fixtures::band_png;
use crate::scripted::BandReply;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// What the server saw for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub file_name: String,
    pub size: usize,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct MockState {
    template: Vec<String>,
    rasters: Mutex<HashMap<String, Vec<String>>>,
    uploads: Mutex<Vec<ReceivedUpload>>,
    upload_failure: Mutex<Option<(u16, String)>>,
    band_replies: Mutex<HashMap<u32, BandReply>>,
    band_delays: Mutex<HashMap<u32, Duration>>,
    band_hits: AtomicUsize,
}

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start a server whose uploads report one band per description.
    pub async fn start(descriptions: &[&str]) -> Self {
        let state = Arc::new(MockState {
            template: descriptions.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        });

        let router = Router::new()
            .route("/api/upload-geotiff", post(upload_handler))
            .route("/api/geotiff-metadata/:filename", get(metadata_handler))
            .route("/api/geotiff-band/:filename/:band", get(band_handler))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr = listener
            .local_addr()
            .expect("mock server has no local address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr, state, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a raster without uploading it.
    pub fn insert_raster(&self, file_name: &str, descriptions: &[&str]) {
        self.state.rasters.lock().unwrap().insert(
            file_name.to_string(),
            descriptions.iter().map(|d| d.to_string()).collect(),
        );
    }

    pub fn fail_uploads(&self, status: u16, detail: &str) {
        *self.state.upload_failure.lock().unwrap() = Some((status, detail.to_string()));
    }

    pub fn set_band_reply(&self, band: u32, reply: BandReply) {
        self.state.band_replies.lock().unwrap().insert(band, reply);
    }

    pub fn set_band_delay(&self, band: u32, delay: Duration) {
        self.state.band_delays.lock().unwrap().insert(band, delay);
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn band_hits(&self) -> usize {
        self.state.band_hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn error_response(status: u16, detail: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn is_raster_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".tif") || lower.ends_with(".tiff")
}

/// POST /api/upload-geotiff
async fn upload_handler(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(400, &e.to_string()),
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return error_response(400, &e.to_string()),
        };

        // The body is read in full first so the client always gets a response.
        let failure = state.upload_failure.lock().unwrap().clone();
        if let Some((status, detail)) = failure {
            return error_response(status, &detail);
        }
        if !is_raster_name(&file_name) {
            return error_response(
                400,
                "Formato de archivo no válido. Solo se admiten .tif y .tiff",
            );
        }

        state
            .rasters
            .lock()
            .unwrap()
            .entry(file_name.clone())
            .or_insert_with(|| state.template.clone());
        state.uploads.lock().unwrap().push(ReceivedUpload {
            file_name: file_name.clone(),
            size: data.len(),
            content_type,
        });

        return Json(json!({
            "filename": file_name,
            "detail": "Archivo subido con éxito"
        }))
        .into_response();
    }

    error_response(422, "field required: file")
}

/// GET /api/geotiff-metadata/:filename
async fn metadata_handler(
    State(state): State<Arc<MockState>>,
    Path(filename): Path<String>,
) -> Response {
    let descriptions = state.rasters.lock().unwrap().get(&filename).cloned();
    match descriptions {
        Some(descriptions) => Json(json!({
            "bands": descriptions.len(),
            "descriptions": descriptions,
            "width": 8,
            "height": 6
        }))
        .into_response(),
        None => error_response(404, "Archivo no encontrado"),
    }
}

/// GET /api/geotiff-band/:filename/:band
async fn band_handler(
    State(state): State<Arc<MockState>>,
    Path((filename, band)): Path<(String, String)>,
) -> Response {
    state.band_hits.fetch_add(1, Ordering::SeqCst);

    let band_count = state
        .rasters
        .lock()
        .unwrap()
        .get(&filename)
        .map(|descriptions| descriptions.len() as u32);
    let band_count = match band_count {
        Some(count) => count,
        None => return error_response(404, "Archivo no encontrado"),
    };
    let band: u32 = match band.parse() {
        Ok(band) => band,
        Err(_) => return error_response(422, "band_index must be an integer"),
    };
    if band == 0 || band > band_count {
        return error_response(400, "Índice de banda fuera de rango");
    }

    let delay = state.band_delays.lock().unwrap().get(&band).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let reply = state
        .band_replies
        .lock()
        .unwrap()
        .get(&band)
        .cloned()
        .unwrap_or_else(|| BandReply::Image(band_png(band)));

    match reply {
        BandReply::Image(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        BandReply::Empty => ([(header::CONTENT_TYPE, "image/png")], Bytes::new()).into_response(),
        BandReply::Garbage => (
            [(header::CONTENT_TYPE, "image/png")],
            Bytes::from_static(b"this is not an image"),
        )
            .into_response(),
        BandReply::Error(status, detail) => error_response(status, &detail),
    }
}
