//! Background network work.
//!
//! Every service call runs off the UI thread. Loads, render fetches and
//! saves each get a short-lived thread; image uploads go through one
//! long-lived paste worker that handles jobs strictly in submission order.
//! Results come back on a single channel that the event loop drains each
//! tick.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::convert::HtmlConverter;
use crate::loader::{LoadTicket, LoadedText, load_content};
use crate::save::{SaveRequest, dispatch};
use crate::service::{ContentId, ContentService, ImageUpload, ServiceError};

/// A finished piece of background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Editor content fetched and, if needed, converted.
    Loaded {
        ticket: LoadTicket,
        result: Result<LoadedText, ServiceError>,
    },
    /// Viewer text fetched from the render service.
    Rendered {
        ticket: LoadTicket,
        result: Result<String, ServiceError>,
    },
    /// A save round-trip completed.
    Saved {
        request: SaveRequest,
        result: Result<serde_json::Value, ServiceError>,
    },
    /// An image upload for document `id` produced a location.
    ImageUploaded { id: ContentId, location: String },
}

/// Owns the result channel and the paste worker.
pub struct Workers {
    service: Arc<dyn ContentService>,
    converter: HtmlConverter,
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    uploads: Option<Sender<UploadJob>>,
}

/// An image and the document it was pasted into.
type UploadJob = (ContentId, ImageUpload);

impl Workers {
    pub fn new(service: Arc<dyn ContentService>, converter: HtmlConverter) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            converter,
            tx,
            rx,
            uploads: None,
        }
    }

    /// Fetch editor content for `ticket` in the background.
    pub fn spawn_load(&self, ticket: LoadTicket) {
        let service = Arc::clone(&self.service);
        let converter = self.converter.clone();
        let tx = self.tx.clone();
        spawn_named("webpart-load", move || {
            let result = load_content(service.as_ref(), &ticket.id, &converter);
            let _ = tx.send(WorkerEvent::Loaded { ticket, result });
        });
    }

    /// Fetch viewer text for `ticket` in the background.
    pub fn spawn_render_fetch(&self, ticket: LoadTicket) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        spawn_named("webpart-render", move || {
            let result = service.fetch_rendered_text(&ticket.id);
            let _ = tx.send(WorkerEvent::Rendered { ticket, result });
        });
    }

    /// Post `request` in the background.
    pub fn spawn_save(&self, request: SaveRequest) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        spawn_named("webpart-save", move || {
            let result = dispatch(service.as_ref(), &request);
            let _ = tx.send(WorkerEvent::Saved { request, result });
        });
    }

    /// Hand images for document `id` to the paste worker, starting it on
    /// first use.
    pub fn queue_uploads(&mut self, id: &ContentId, images: Vec<ImageUpload>) {
        for image in images {
            let Some(sender) = self.upload_sender() else {
                tracing::warn!(file_name = %image.file_name, "paste worker unavailable, dropping image");
                continue;
            };
            if let Err(mpsc::SendError((_, image))) = sender.send((id.clone(), image)) {
                tracing::warn!(file_name = %image.file_name, "paste worker stopped, dropping image");
                self.uploads = None;
            }
        }
    }

    fn upload_sender(&mut self) -> Option<&Sender<UploadJob>> {
        if self.uploads.is_none() {
            let (jobs_tx, jobs_rx) = mpsc::channel::<UploadJob>();
            let service = Arc::clone(&self.service);
            let tx = self.tx.clone();
            let spawned = spawn_named("webpart-paste", move || {
                for (id, image) in jobs_rx {
                    upload_one(service.as_ref(), id, image, &tx);
                }
                tracing::debug!("paste worker finished");
            });
            if spawned {
                self.uploads = Some(jobs_tx);
            }
        }
        self.uploads.as_ref()
    }

    /// Next finished result, if one is ready.
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workers")
            .field("paste_worker", &self.uploads.is_some())
            .finish_non_exhaustive()
    }
}

fn upload_one(
    service: &dyn ContentService,
    id: ContentId,
    image: ImageUpload,
    tx: &Sender<WorkerEvent>,
) {
    let file_name = image.file_name.clone();
    match service.upload_image(image) {
        Ok(location) if location.is_empty() => {
            tracing::warn!(%id, %file_name, "upload returned an empty location");
        }
        Ok(location) => {
            tracing::debug!(%id, %file_name, %location, "image uploaded");
            let _ = tx.send(WorkerEvent::ImageUploaded { id, location });
        }
        Err(err) => {
            tracing::warn!(%id, %file_name, %err, "image upload failed");
        }
    }
}

fn spawn_named(name: &str, job: impl FnOnce() + Send + 'static) -> bool {
    match thread::Builder::new().name(name.to_string()).spawn(job) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(thread = name, %err, "failed to spawn worker");
            false
        }
    }
}
