//! Paste interception.
//!
//! A paste that carries images never inserts anything directly. The images
//! are handed to the upload worker, and each returned location is appended
//! to the document as a markdown image reference. Pastes without images
//! fall through to ordinary text insertion.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use image::ImageFormat;
use thiserror::Error;

use crate::service::ImageUpload;

/// Alt text of every reference the interceptor writes.
pub const PASTED_IMAGE_ALT: &str = "Pasted Image";

/// One representation offered by the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardItem {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new("text/plain", text.as_bytes().to_vec())
    }

    /// Whether the item is an image, judged by a MIME type starting with
    /// `image`.
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image")
    }
}

/// Everything one paste gesture delivered, in clipboard order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteEvent {
    pub items: Vec<ClipboardItem>,
}

impl PasteEvent {
    pub const fn new(items: Vec<ClipboardItem>) -> Self {
        Self { items }
    }

    fn pasted_text(&self) -> String {
        self.items
            .iter()
            .filter(|item| item.mime.starts_with("text/plain"))
            .map(|item| String::from_utf8_lossy(&item.data).into_owned())
            .collect()
    }
}

/// What the editor should do with a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteDecision {
    /// No images: insert the text at the cursor.
    Insert(String),
    /// Default handling is suppressed; upload these images in order.
    Upload(Vec<ImageUpload>),
}

/// Decide how a paste is handled.
pub fn intercept(event: PasteEvent) -> PasteDecision {
    if !event.items.iter().any(ClipboardItem::is_image) {
        return PasteDecision::Insert(event.pasted_text());
    }
    let uploads = event
        .items
        .into_iter()
        .filter(ClipboardItem::is_image)
        .enumerate()
        .map(|(index, item)| ImageUpload {
            file_name: upload_file_name(index, &item.mime),
            mime: item.mime,
            bytes: item.data,
        })
        .collect::<Vec<_>>();
    tracing::debug!(count = uploads.len(), "paste carries images");
    PasteDecision::Upload(uploads)
}

fn upload_file_name(index: usize, mime: &str) -> String {
    let extension = mime
        .split_once('/')
        .map(|(_, subtype)| subtype.split(['+', ';']).next().unwrap_or(subtype))
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("bin");
    format!("pasted-{}.{extension}", index + 1)
}

#[derive(Debug, Error)]
pub enum ImageFileError {
    #[error("{}: not a known image type", path.display())]
    UnknownType { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Read an image file from disk for upload.
///
/// The MIME type comes from the file extension.
///
/// # Errors
/// Returns [`ImageFileError::UnknownType`] when the extension is not an
/// image format and [`ImageFileError::Read`] when the file cannot be read.
pub fn image_from_file(path: &Path) -> Result<ImageUpload, ImageFileError> {
    let format = ImageFormat::from_path(path).map_err(|_| ImageFileError::UnknownType {
        path: path.to_path_buf(),
    })?;
    let bytes = std::fs::read(path).map_err(|source| ImageFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());
    tracing::debug!(%file_name, bytes = bytes.len(), "image file read");
    Ok(ImageUpload {
        file_name,
        mime: format.to_mime_type().to_string(),
        bytes,
    })
}

/// Markdown appended for an uploaded image.
pub fn image_reference(location: &str) -> String {
    format!("\n\n![{PASTED_IMAGE_ALT}]({location})")
}

/// `current` followed by the reference for `location`.
///
/// Returns `None` for an empty location, which leaves the document alone.
pub fn splice_image_reference(current: &str, location: &str) -> Option<String> {
    if location.is_empty() {
        return None;
    }
    let mut text = String::with_capacity(current.len() + location.len() + 20);
    text.push_str(current);
    text.push_str(&image_reference(location));
    Some(text)
}

/// Keeps terminal bracketed paste enabled while alive.
///
/// Creating the scope turns bracketed paste on; dropping it turns it off
/// again, so the interception window matches the editor session exactly.
pub struct PasteScope<W: Write> {
    out: W,
}

impl<W: Write> PasteScope<W> {
    /// # Errors
    /// Returns the I/O error from writing the enable sequence.
    pub fn enable(mut out: W) -> io::Result<Self> {
        execute!(out, EnableBracketedPaste)?;
        tracing::debug!("bracketed paste enabled");
        Ok(Self { out })
    }
}

impl<W: Write> Drop for PasteScope<W> {
    fn drop(&mut self) {
        if let Err(err) = execute!(self.out, DisableBracketedPaste) {
            tracing::warn!(%err, "failed to disable bracketed paste");
        }
    }
}

impl<W: Write> std::fmt::Debug for PasteScope<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteScope").finish_non_exhaustive()
    }
}
