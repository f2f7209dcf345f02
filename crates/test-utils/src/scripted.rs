//! In-memory [`BandBackend`] with scripted responses.
//!
//! By default every call answers immediately. After [`ScriptedBackend::gate_bands`]
//! band requests park until the test releases them, which makes it possible
//! to resolve overlapping requests in any order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use band_client::{BandBackend, ClientError, ClientResult, ProgressTracker};
use band_common::{BandIndex, BandMetadata, UploadedAsset};
use bytes::Bytes;
use tokio::sync::{oneshot, Notify};

use crate::fixtures::band_png;

/// Bytes the scripted upload reports per progress step.
const UPLOAD_STEP: u64 = 1024;

/// Response to one band request.
#[derive(Debug, Clone)]
pub enum BandReply {
    Image(Bytes),
    /// 200 with a zero-byte body
    Empty,
    /// Bytes that do not decode as an image
    Garbage,
    Error(u16, String),
}

impl BandReply {
    pub fn image(band: u32) -> Self {
        BandReply::Image(band_png(band))
    }

    fn into_result(self) -> ClientResult<Bytes> {
        match self {
            BandReply::Image(bytes) => Ok(bytes),
            BandReply::Empty => Err(ClientError::EmptyPayload),
            BandReply::Garbage => Ok(Bytes::from_static(b"this is not an image")),
            BandReply::Error(status, detail) => Err(ClientError::Server { status, detail }),
        }
    }
}

#[derive(Debug, Clone)]
enum Scripted<T> {
    Reply(T),
    Fail(u16, String),
}

struct PendingBand {
    band: u32,
    reply: oneshot::Sender<BandReply>,
}

pub struct ScriptedBackend {
    token: Mutex<Option<String>>,
    upload: Mutex<Scripted<()>>,
    metadata: Mutex<Scripted<BandMetadata>>,
    band_replies: Mutex<HashMap<u32, BandReply>>,
    gated: AtomicBool,
    pending: Mutex<Vec<PendingBand>>,
    requested: Notify,
    band_log: Mutex<Vec<u32>>,
    upload_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(metadata: BandMetadata) -> Self {
        Self {
            token: Mutex::new(None),
            upload: Mutex::new(Scripted::Reply(())),
            metadata: Mutex::new(Scripted::Reply(metadata)),
            band_replies: Mutex::new(HashMap::new()),
            gated: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            requested: Notify::new(),
            band_log: Mutex::new(Vec::new()),
            upload_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    /// Answer uploads with `token` instead of echoing the file name.
    pub fn with_token(self, token: &str) -> Self {
        *self.token.lock().unwrap() = Some(token.to_string());
        self
    }

    pub fn fail_upload(&self, status: u16, detail: &str) {
        *self.upload.lock().unwrap() = Scripted::Fail(status, detail.to_string());
    }

    pub fn fail_metadata(&self, status: u16, detail: &str) {
        *self.metadata.lock().unwrap() = Scripted::Fail(status, detail.to_string());
    }

    pub fn set_metadata(&self, metadata: BandMetadata) {
        *self.metadata.lock().unwrap() = Scripted::Reply(metadata);
    }

    /// Fixed reply for ungated requests of `band`.
    pub fn set_band_reply(&self, band: u32, reply: BandReply) {
        self.band_replies.lock().unwrap().insert(band, reply);
    }

    /// Hold all further band requests until released.
    pub fn gate_bands(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Wait until at least `n` band requests are parked.
    pub async fn wait_for_pending(&self, n: usize) {
        loop {
            let notified = self.requested.notified();
            if self.pending.lock().unwrap().len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Answer the oldest parked request for `band`. Returns false if none.
    pub fn release(&self, band: u32, reply: BandReply) -> bool {
        let parked = {
            let mut pending = self.pending.lock().unwrap();
            match pending.iter().position(|p| p.band == band) {
                Some(pos) => pending.remove(pos),
                None => return false,
            }
        };
        // The requester may have gone away; that is not the test's concern.
        let _ = parked.reply.send(reply);
        true
    }

    /// Answer the oldest parked request for `band` with its default image.
    pub fn release_image(&self, band: u32) -> bool {
        self.release(band, BandReply::image(band))
    }

    pub fn pending_bands(&self) -> Vec<u32> {
        self.pending.lock().unwrap().iter().map(|p| p.band).collect()
    }

    /// Every band requested so far, in request order.
    pub fn band_calls(&self) -> Vec<u32> {
        self.band_log.lock().unwrap().clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    fn reply_for(&self, band: u32) -> BandReply {
        self.band_replies
            .lock()
            .unwrap()
            .get(&band)
            .cloned()
            .unwrap_or_else(|| BandReply::image(band))
    }
}

#[async_trait]
impl BandBackend for ScriptedBackend {
    async fn upload(
        &self,
        file_name: &str,
        bytes: Bytes,
        progress: ProgressTracker,
    ) -> ClientResult<UploadedAsset> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        progress.start();

        let total = bytes.len() as u64;
        let mut sent = 0;
        while sent < total {
            let step = UPLOAD_STEP.min(total - sent);
            progress.advance(step);
            sent += step;
            tokio::task::yield_now().await;
        }

        let scripted = self.upload.lock().unwrap().clone();
        if let Scripted::Fail(status, detail) = scripted {
            return Err(ClientError::Server { status, detail });
        }

        progress.finish();
        let token = self
            .token
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| file_name.to_string());
        Ok(UploadedAsset::new(token))
    }

    async fn metadata(&self, _asset: &UploadedAsset) -> ClientResult<BandMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.metadata.lock().unwrap().clone();
        match scripted {
            Scripted::Reply(metadata) => Ok(metadata),
            Scripted::Fail(status, detail) => Err(ClientError::Server { status, detail }),
        }
    }

    async fn band_image(&self, _asset: &UploadedAsset, band: BandIndex) -> ClientResult<Bytes> {
        let band = band.get();
        self.band_log.lock().unwrap().push(band);

        if !self.gated.load(Ordering::SeqCst) {
            return self.reply_for(band).into_result();
        }

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .push(PendingBand { band, reply: tx });
        self.requested.notify_waiters();

        match rx.await {
            Ok(reply) => reply.into_result(),
            Err(_) => Err(ClientError::InvalidResponse(
                "scripted request dropped without a reply".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::rgb_metadata;

    #[tokio::test]
    async fn test_ungated_band_answers_immediately() {
        let backend = ScriptedBackend::new(rgb_metadata());
        let asset = UploadedAsset::new("a.tif");
        let band = BandIndex::new(2, 3).unwrap();
        let bytes = backend.band_image(&asset, band).await.unwrap();
        assert_eq!(bytes, band_png(2));
        assert_eq!(backend.band_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_gated_band_waits_for_release() {
        let backend = std::sync::Arc::new(ScriptedBackend::new(rgb_metadata()));
        backend.gate_bands();

        let requester = backend.clone();
        let task = tokio::spawn(async move {
            let asset = UploadedAsset::new("a.tif");
            requester
                .band_image(&asset, BandIndex::new(1, 3).unwrap())
                .await
        });

        backend.wait_for_pending(1).await;
        assert_eq!(backend.pending_bands(), vec![1]);
        assert!(!backend.release_image(2));
        assert!(backend.release(1, BandReply::Empty));

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ClientError::EmptyPayload)));
    }

    #[tokio::test]
    async fn test_upload_progress_and_token() {
        let backend = ScriptedBackend::new(rgb_metadata()).with_token("srv-token.tif");
        let tracker = ProgressTracker::silent(5000);
        let asset = backend
            .upload("local.tif", crate::fixtures::raster_payload(5000), tracker.clone())
            .await
            .unwrap();
        assert_eq!(asset.filename, "srv-token.tif");
        assert_eq!(tracker.bytes_sent(), 5000);
    }
}
