//! Content loading.
//!
//! A load fetches the JSON record for an identifier and produces the
//! markdown text the editor shows. Legacy records carry `html`, which is
//! converted before anything sees it; newer records carry `mdx`, which is
//! used verbatim. Each load is tagged with a [`LoadTicket`] so a response
//! for an identifier the user already navigated away from is discarded.

use crate::convert::HtmlConverter;
use crate::service::{ContentId, ContentPayload, ContentService, ServiceError};

/// Which field of the record the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Converted from the `html` field.
    Html,
    /// Taken as-is from the `mdx` field.
    Markup,
}

/// Markdown ready to push into a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedText {
    pub text: String,
    pub origin: Origin,
}

/// Pick the usable field of `payload`.
///
/// `html` wins when both are present, even when it is empty. Returns `None`
/// when neither field is present.
pub fn resolve_payload(
    payload: ContentPayload,
    convert: impl FnOnce(&str) -> String,
) -> Option<LoadedText> {
    if let Some(html) = payload.html {
        return Some(LoadedText {
            text: convert(&html),
            origin: Origin::Html,
        });
    }
    payload.mdx.map(|text| LoadedText {
        text,
        origin: Origin::Markup,
    })
}

/// Fetch and resolve the content for `id`.
///
/// Conversion runs here, on the calling thread, so callers only ever
/// receive complete markdown.
///
/// # Errors
/// Returns [`ServiceError::MissingField`] when the record has neither
/// `html` nor `mdx`, and passes through the transport and status errors of
/// [`ContentService::fetch_content`].
pub fn load_content(
    service: &dyn ContentService,
    id: &ContentId,
    converter: &HtmlConverter,
) -> Result<LoadedText, ServiceError> {
    let payload = service.fetch_content(id)?;
    let loaded =
        resolve_payload(payload, |html| converter.convert(html)).ok_or(ServiceError::MissingField)?;
    tracing::debug!(%id, origin = ?loaded.origin, bytes = loaded.text.len(), "content resolved");
    Ok(loaded)
}

/// Identifies one fetch so its result can be matched to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: ContentId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Hands out tickets and tracks which one is current.
///
/// Starting a new load supersedes the previous ticket; results carrying a
/// superseded ticket are rejected by [`Self::settle`].
#[derive(Debug, Default)]
pub struct LoadTracker {
    generation: u64,
    current: Option<LoadTicket>,
    state: LoadState,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load for `id` and return its ticket.
    pub fn begin(&mut self, id: ContentId) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            id,
            generation: self.generation,
        };
        self.current = Some(ticket.clone());
        self.state = LoadState::Loading;
        ticket
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.current.as_ref() == Some(ticket)
    }

    /// Record the outcome of the load behind `ticket`.
    ///
    /// Returns `false`, leaving the state untouched, when the ticket is
    /// stale or was already settled.
    pub fn settle(&mut self, ticket: &LoadTicket, succeeded: bool) -> bool {
        if !self.is_current(ticket) || self.state != LoadState::Loading {
            tracing::debug!(
                id = %ticket.id,
                generation = ticket.generation,
                "dropping stale load result"
            );
            return false;
        }
        self.state = if succeeded {
            LoadState::Loaded
        } else {
            LoadState::Failed
        };
        true
    }

    pub const fn state(&self) -> LoadState {
        self.state
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
