use crate::app::{App, Message, Mode, Model, ToastLevel, update};
use crate::clipboard::{ClipboardError, ClipboardSource, SystemClipboard, collect_paste};
use crate::paste::{ClipboardItem, PasteDecision, PasteEvent, image_from_file, intercept};
use crate::service::ImageUpload;
use crate::worker::Workers;

/// The clipboard slot, opened on first paste.
pub(super) type ClipboardSlot = Option<Box<dyn ClipboardSource>>;

impl App {
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        workers: &mut Workers,
        clipboard: &mut ClipboardSlot,
        msg: &Message,
    ) {
        if let Message::Paste(pasted) = msg
            && model.mode == Mode::Edit
        {
            Self::handle_paste(model, workers, clipboard, pasted.clone());
        }
        Self::dispatch_pending_work(model, workers);
    }

    /// Hand fetches, saves and chosen image files queued by `update` to the
    /// workers.
    pub(super) fn dispatch_pending_work(model: &mut Model, workers: &mut Workers) {
        if let Some(ticket) = model.pending_load.take() {
            tracing::debug!(id = %ticket.id, generation = ticket.generation, mode = ?model.mode, "starting fetch");
            match model.mode {
                Mode::Edit => workers.spawn_load(ticket),
                Mode::View => workers.spawn_render_fetch(ticket),
            }
        }
        if let Some(request) = model.pending_save.take() {
            tracing::debug!(id = %request.id, revision = request.revision, "starting save");
            workers.spawn_save(request);
        }
        if let Some(path) = model.pending_image.take() {
            match image_from_file(&path) {
                Ok(upload) => {
                    let message = format!("Uploading {}", upload.file_name);
                    Self::queue_uploads(model, workers, vec![upload], message);
                }
                Err(err) => {
                    tracing::warn!(%err, "image file not uploaded");
                    model.show_toast(ToastLevel::Error, format!("Image not uploaded: {err}"));
                }
            }
        }
    }

    /// Upload `images` for the open document and append their references
    /// as they finish.
    fn queue_uploads(
        model: &mut Model,
        workers: &mut Workers,
        images: Vec<ImageUpload>,
        message: String,
    ) {
        let Some(id) = model.content_id.clone() else {
            tracing::warn!(count = images.len(), "no document open, dropping images");
            return;
        };
        tracing::info!(%id, count = images.len(), "uploading images");
        model.show_toast(ToastLevel::Info, message);
        workers.queue_uploads(&id, images);
    }

    fn handle_paste(
        model: &mut Model,
        workers: &mut Workers,
        clipboard: &mut ClipboardSlot,
        pasted: Option<String>,
    ) {
        let event = match Self::clipboard_source(clipboard) {
            Ok(source) => collect_paste(source, pasted.clone()),
            Err(err) => Err(err),
        };
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(%err, "clipboard read failed");
                let Some(text) = pasted else {
                    model.show_toast(ToastLevel::Error, format!("Paste failed: {err}"));
                    return;
                };
                // The terminal already delivered the text; paste it without images.
                PasteEvent::new(vec![ClipboardItem::text(&text)])
            }
        };
        match intercept(event) {
            PasteDecision::Insert(text) => {
                if !text.is_empty() {
                    *model = update(std::mem::take(model), Message::EditorInsertText(text));
                }
            }
            PasteDecision::Upload(images) => {
                let count = images.len();
                let message = if count == 1 {
                    "Uploading pasted image".to_string()
                } else {
                    format!("Uploading {count} pasted images")
                };
                Self::queue_uploads(model, workers, images, message);
            }
        }
    }

    fn clipboard_source(
        slot: &mut ClipboardSlot,
    ) -> Result<&mut (dyn ClipboardSource + 'static), ClipboardError> {
        if slot.is_none() {
            *slot = Some(Box::new(SystemClipboard::new()?));
        }
        slot.as_deref_mut()
            .ok_or_else(|| ClipboardError::Unavailable("no clipboard".to_string()))
    }
}
