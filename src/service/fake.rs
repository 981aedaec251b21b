//! In-memory [`ContentService`] for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ContentId, ContentPayload, ContentService, ImageUpload, ServiceError};

/// Scripted service: every response is configured up front and every
/// request is recorded.
#[derive(Debug, Default)]
pub struct FakeService {
    content: Option<ContentPayload>,
    rendered: Option<String>,
    locations: Mutex<VecDeque<String>>,
    fail_updates: bool,
    updates: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<ImageUpload>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, payload: ContentPayload) -> Self {
        self.content = Some(payload);
        self
    }

    pub fn with_rendered(mut self, text: &str) -> Self {
        self.rendered = Some(text.to_string());
        self
    }

    /// Queue upload answers; an exhausted queue fails the upload.
    pub fn with_locations(self, locations: &[&str]) -> Self {
        self.locations
            .lock()
            .unwrap()
            .extend(locations.iter().map(ToString::to_string));
        self
    }

    pub const fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<ImageUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

fn server_error() -> ServiceError {
    ServiceError::BadStatus {
        status: 500,
        reason: "Internal Server Error".to_string(),
    }
}

impl ContentService for FakeService {
    fn fetch_content(&self, _id: &ContentId) -> Result<ContentPayload, ServiceError> {
        self.content.clone().ok_or_else(server_error)
    }

    fn upload_image(&self, image: ImageUpload) -> Result<String, ServiceError> {
        self.uploads.lock().unwrap().push(image);
        self.locations
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ServiceError::Upload("no location".to_string()))
    }

    fn update_content(
        &self,
        id: &ContentId,
        text: &str,
    ) -> Result<serde_json::Value, ServiceError> {
        self.updates
            .lock()
            .unwrap()
            .push((id.as_str().to_string(), text.to_string()));
        if self.fail_updates {
            Err(server_error())
        } else {
            Ok(serde_json::json!({ "status": "ok" }))
        }
    }

    fn fetch_rendered_text(&self, _id: &ContentId) -> Result<String, ServiceError> {
        self.rendered.clone().ok_or_else(server_error)
    }
}
