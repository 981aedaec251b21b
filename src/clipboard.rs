//! System clipboard access for the paste interceptor.
//!
//! Terminals deliver pasted text through bracketed paste, but never image
//! data. Images are read from the system clipboard directly and encoded as
//! PNG for upload.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use crate::paste::{ClipboardItem, PasteEvent};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard image could not be encoded: {0}")]
    Encode(String),
}

/// Source of clipboard contents.
pub trait ClipboardSource {
    /// The image currently on the clipboard, PNG-encoded.
    ///
    /// # Errors
    /// Returns [`ClipboardError`] when the clipboard cannot be read or the
    /// image cannot be encoded. An empty clipboard is `Ok(None)`.
    fn image(&mut self) -> Result<Option<ClipboardItem>, ClipboardError>;

    /// The text currently on the clipboard.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unavailable`] when the clipboard cannot be
    /// read. An empty clipboard is `Ok(None)`.
    fn text(&mut self) -> Result<Option<String>, ClipboardError>;
}

/// Build the paste event for one gesture.
///
/// `pasted` is the text delivered by the terminal, if any. When it is absent
/// (a `Ctrl+V` keypress) the clipboard text is used instead. A clipboard
/// image, when present, follows the text.
///
/// # Errors
/// Propagates the clipboard's read errors.
pub fn collect_paste(
    clipboard: &mut dyn ClipboardSource,
    pasted: Option<String>,
) -> Result<PasteEvent, ClipboardError> {
    let mut items = Vec::new();
    let text = match pasted {
        Some(text) => Some(text),
        None => clipboard.text()?,
    };
    if let Some(text) = text.filter(|text| !text.is_empty()) {
        items.push(ClipboardItem::text(&text));
    }
    if let Some(image) = clipboard.image()? {
        items.push(image);
    }
    Ok(PasteEvent::new(items))
}

/// The platform clipboard via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// # Errors
    /// Returns [`ClipboardError::Unavailable`] when no clipboard can be
    /// opened (for example over SSH without a display).
    pub fn new() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard").finish_non_exhaustive()
    }
}

impl ClipboardSource for SystemClipboard {
    fn image(&mut self) -> Result<Option<ClipboardItem>, ClipboardError> {
        let data = match self.inner.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(err) => return Err(ClipboardError::Unavailable(err.to_string())),
        };
        let width = u32::try_from(data.width).map_err(|err| ClipboardError::Encode(err.to_string()))?;
        let height =
            u32::try_from(data.height).map_err(|err| ClipboardError::Encode(err.to_string()))?;
        let png = encode_png(width, height, data.bytes.into_owned())?;
        tracing::debug!(width, height, bytes = png.len(), "clipboard image encoded");
        Ok(Some(ClipboardItem::new("image/png", png)))
    }

    fn text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(ClipboardError::Unavailable(err.to_string())),
        }
    }
}

/// Encode raw RGBA pixels as PNG.
///
/// # Errors
/// Returns [`ClipboardError::Encode`] when the buffer does not match the
/// dimensions or encoding fails.
pub fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, ClipboardError> {
    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| ClipboardError::Encode("pixel buffer does not match size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|err| ClipboardError::Encode(err.to_string()))?;
    Ok(png.into_inner())
}
