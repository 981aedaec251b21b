//! Save dispatch.
//!
//! Saving posts the whole document text; the service encodes it as a form
//! body together with the identifier. Only one save is in flight at a time:
//! a save requested while another is pending is folded into a single
//! follow-up that runs with whatever text is current once the pending one
//! finishes.

use crate::service::{ContentId, ContentService, ServiceError};

/// A snapshot of the document taken when the user asked to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub id: ContentId,
    pub text: String,
    /// Buffer revision the text was read at.
    pub revision: u64,
}

impl SaveRequest {
    pub fn new(id: ContentId, text: impl Into<String>, revision: u64) -> Self {
        Self {
            id,
            text: text.into(),
            revision,
        }
    }
}

/// Post `request` and return the service's JSON answer.
///
/// # Errors
/// Passes through the errors of [`ContentService::update_content`].
pub fn dispatch(
    service: &dyn ContentService,
    request: &SaveRequest,
) -> Result<serde_json::Value, ServiceError> {
    service.update_content(&request.id, &request.text)
}

/// Serializes saves: at most one in flight, later requests coalesced.
#[derive(Debug, Default)]
pub struct SaveQueue {
    in_flight: Option<u64>,
    queued: bool,
}

impl SaveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a save at `revision`.
    ///
    /// Returns `true` when the caller should start it now, `false` when it
    /// was folded into the follow-up of the save already in flight.
    pub fn request(&mut self, revision: u64) -> bool {
        if self.in_flight.is_some() {
            self.queued = true;
            return false;
        }
        self.in_flight = Some(revision);
        true
    }

    /// Mark the in-flight save finished.
    ///
    /// Returns `true` when a coalesced follow-up should be started now.
    pub fn finish(&mut self) -> bool {
        self.in_flight = None;
        std::mem::take(&mut self.queued)
    }

    pub const fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }
}
