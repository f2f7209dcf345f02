//! Runs a controller on its own task.
//!
//! The controller never leaves the session task. Commands arrive over an
//! mpsc channel; network requests run as spawned tasks and report back over
//! a second channel, where the controller decides whether each result is
//! still wanted. A UI can therefore fire band selections as fast as the user
//! clicks and the display ends up on the last one.

use std::sync::Arc;

use band_client::{BandBackend, ClientResult, ProgressSink, UploadProgress};
use band_common::{BandMetadata, UploadedAsset, ViewerError, ViewerResult};
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::{BandOutcome, BandTicket, BandViewerController, MetadataTicket, UploadTicket};
use crate::decode::ImageDecoder;
use crate::status::ViewerStatus;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error("viewer session has shut down")]
    Closed,
}

/// Notifications published by a running session.
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    UploadProgress(UploadProgress),
    Uploaded(UploadedAsset),
    MetadataLoaded(BandMetadata),
    BandApplied { band: u32 },
    BandDiscarded { band: u32, generation: u64 },
    /// A failure was surfaced in the status area.
    Failed(ViewerError),
}

/// Point-in-time view of the session, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    pub state: &'static str,
    pub asset: Option<UploadedAsset>,
    pub labels: Vec<String>,
    pub active_band: Option<u32>,
    pub image_size: Option<(u32, u32)>,
    pub viewport_scale: Option<f64>,
    pub status: ViewerStatus,
    pub band_pending: bool,
    pub live_resources: usize,
}

enum Command {
    Upload {
        file_name: String,
        bytes: Bytes,
        reply: oneshot::Sender<ViewerResult<()>>,
    },
    SelectBand {
        index: u32,
        reply: oneshot::Sender<ViewerResult<()>>,
    },
    Zoom {
        delta_y: f64,
        focal: (f64, f64),
    },
    Snapshot {
        reply: oneshot::Sender<ViewerSnapshot>,
    },
    Shutdown,
}

enum Completion {
    Upload(UploadTicket, ClientResult<UploadedAsset>),
    Metadata(MetadataTicket, ClientResult<BandMetadata>),
    Band(BandTicket, ClientResult<Bytes>),
}

/// Cheap, clonable handle to a running session.
#[derive(Clone)]
pub struct ViewerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ViewerEvent>,
}

impl ViewerHandle {
    /// Start uploading a file. Returns once the upload is accepted.
    pub async fn upload(&self, file_name: &str, bytes: Bytes) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Upload {
            file_name: file_name.to_string(),
            bytes,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Request a band. Returns once the request is issued, not when the
    /// image is displayed; watch [`ViewerEvent::BandApplied`] for that.
    pub async fn select_band(&self, index: u32) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectBand { index, reply }).await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    pub async fn zoom_with_wheel(&self, delta_y: f64, focal: (f64, f64)) -> Result<(), SessionError> {
        self.send(Command::Zoom { delta_y, focal }).await
    }

    pub async fn snapshot(&self) -> Result<ViewerSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// The task owning a [`BandViewerController`].
pub struct ViewerSession<B, D> {
    controller: BandViewerController<B, D>,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Sender<ViewerEvent>,
    upload_task: Option<JoinHandle<()>>,
}

impl<B, D> ViewerSession<B, D>
where
    B: BandBackend + 'static,
    D: ImageDecoder + 'static,
{
    /// Spawn a session on the current tokio runtime.
    pub fn spawn(controller: BandViewerController<B, D>) -> (ViewerHandle, JoinHandle<()>) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = ViewerHandle {
            commands: commands_tx,
            events: events.clone(),
        };
        let session = ViewerSession {
            controller,
            commands,
            completions_tx,
            completions,
            events,
            upload_task: None,
        };
        let task = tokio::spawn(session.run());
        (handle, task)
    }

    async fn run(mut self) {
        info!("Viewer session started");
        self.controller.mount();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.on_command(command),
                    }
                }
                Some(completion) = self.completions.recv() => {
                    self.on_completion(completion);
                }
            }
        }

        if let Some(task) = self.upload_task.take() {
            task.abort();
        }
        self.controller.unmount();
        info!("Viewer session stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Upload {
                file_name,
                bytes,
                reply,
            } => {
                let accepted = self.start_upload(&file_name, bytes);
                let _ = reply.send(accepted);
            }
            Command::SelectBand { index, reply } => {
                let issued = self.start_band(index);
                let _ = reply.send(issued);
            }
            Command::Zoom { delta_y, focal } => {
                if let Some(viewport) = self.controller.viewport_mut() {
                    viewport.zoom_with_wheel(delta_y, focal);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn start_upload(&mut self, file_name: &str, bytes: Bytes) -> ViewerResult<()> {
        let ticket = self.controller.begin_upload(file_name)?;

        // Only one transfer at a time; the superseded one is aborted.
        if let Some(previous) = self.upload_task.take() {
            debug!("Aborting previous upload");
            previous.abort();
        }

        let events = self.events.clone();
        let sink: ProgressSink = Arc::new(move |progress: UploadProgress| {
            let _ = events.send(ViewerEvent::UploadProgress(progress));
        });
        let request = self.controller.upload_request(&ticket, bytes, Some(sink));
        let completions = self.completions_tx.clone();
        self.upload_task = Some(tokio::spawn(async move {
            let result = request.await;
            let _ = completions.send(Completion::Upload(ticket, result));
        }));
        Ok(())
    }

    fn start_metadata(&mut self, asset: &UploadedAsset) -> ViewerResult<()> {
        let ticket = self.controller.begin_metadata(asset)?;
        let request = self.controller.metadata_request(&ticket);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = completions.send(Completion::Metadata(ticket, result));
        });
        Ok(())
    }

    fn start_band(&mut self, index: u32) -> ViewerResult<()> {
        let ticket = self.controller.request_band(index)?;
        let request = self.controller.band_request(&ticket);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = completions.send(Completion::Band(ticket, result));
        });
        Ok(())
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Upload(ticket, result) => {
                self.upload_task = None;
                match self.controller.finish_upload(ticket, result) {
                    Ok(asset) => {
                        self.publish(ViewerEvent::Uploaded(asset.clone()));
                        if let Err(err) = self.start_metadata(&asset) {
                            warn!(error = %err, "Could not request metadata");
                        }
                    }
                    Err(ViewerError::StaleAsset(_)) => {}
                    Err(err) => self.publish(ViewerEvent::Failed(err)),
                }
            }
            Completion::Metadata(ticket, result) => {
                match self.controller.finish_metadata(ticket, result) {
                    Ok(metadata) => {
                        self.publish(ViewerEvent::MetadataLoaded(metadata));
                        if let Err(err) = self.start_band(1) {
                            warn!(error = %err, "Could not request first band");
                        }
                    }
                    Err(ViewerError::StaleAsset(_)) => {}
                    Err(err) => self.publish(ViewerEvent::Failed(err)),
                }
            }
            Completion::Band(ticket, result) => {
                match self.controller.complete_band(ticket, result) {
                    Ok(BandOutcome::Applied { band }) => {
                        self.publish(ViewerEvent::BandApplied { band: band.get() })
                    }
                    Ok(BandOutcome::Discarded { band, generation }) => {
                        self.publish(ViewerEvent::BandDiscarded {
                            band: band.get(),
                            generation,
                        })
                    }
                    Err(err) => self.publish(ViewerEvent::Failed(err)),
                }
            }
        }
    }

    fn snapshot(&self) -> ViewerSnapshot {
        let active = self.controller.active();
        ViewerSnapshot {
            state: self.controller.state().name(),
            asset: self.controller.asset().cloned(),
            labels: self.controller.band_labels(),
            active_band: active.map(|a| a.band.get()),
            image_size: active.map(|a| (a.image.width, a.image.height)),
            viewport_scale: active.map(|a| a.viewport.scale),
            status: self.controller.status().clone(),
            band_pending: self.controller.band_pending(),
            live_resources: self.controller.resources().live(),
        }
    }

    fn publish(&self, event: ViewerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
