//! Remote webpart content service.
//!
//! [`ContentService`] is the seam between the orchestration code and the
//! servlet endpoints. [`HttpContentService`] talks to the real service;
//! tests substitute in-memory fakes.

mod error;
#[cfg(test)]
pub(crate) mod fake;
mod form;
mod http;

pub use error::ServiceError;
pub use form::encode_form;
pub use http::{DEFAULT_CONTENT_SERVICE, DEFAULT_RENDER_SERVICE, Endpoints, HttpContentService};

use serde::Deserialize;

/// Opaque identifier of a unit of content, as supplied on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON body of the content endpoint.
///
/// `html` is the legacy rich-text body, `mdx` the markdown body. A JSON
/// `null` deserializes to `None` and counts as absent; an empty string is
/// present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContentPayload {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub mdx: Option<String>,
}

/// An image pulled off the clipboard, ready for multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Everything the editor and viewer need from the remote service.
pub trait ContentService: Send + Sync {
    /// Read the JSON content record for `id`.
    ///
    /// # Errors
    /// Returns [`ServiceError::Network`] when the request cannot be sent,
    /// [`ServiceError::BadStatus`] on a non-OK status and
    /// [`ServiceError::Decode`] when the body is not the expected JSON.
    fn fetch_content(&self, id: &ContentId) -> Result<ContentPayload, ServiceError>;

    /// Upload an image and return the location the service stored it at.
    ///
    /// # Errors
    /// Returns [`ServiceError::Upload`] when the service answers without a
    /// usable location, plus the transport errors of [`Self::fetch_content`].
    fn upload_image(&self, image: ImageUpload) -> Result<String, ServiceError>;

    /// Post the document text for `id` back to the service.
    ///
    /// # Errors
    /// Same transport and status errors as [`Self::fetch_content`].
    fn update_content(&self, id: &ContentId, text: &str)
    -> Result<serde_json::Value, ServiceError>;

    /// Read the plain markdown text the viewer renders.
    ///
    /// # Errors
    /// Same transport and status errors as [`Self::fetch_content`].
    fn fetch_rendered_text(&self, id: &ContentId) -> Result<String, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_with_html_only() {
        let payload: ContentPayload = serde_json::from_str(r#"{"html":"<p>Hi</p>"}"#).unwrap();
        assert_eq!(payload.html.as_deref(), Some("<p>Hi</p>"));
        assert_eq!(payload.mdx, None);
    }

    #[test]
    fn test_payload_empty_string_is_present() {
        let payload: ContentPayload = serde_json::from_str(r#"{"mdx":""}"#).unwrap();
        assert_eq!(payload.mdx.as_deref(), Some(""));
    }

    #[test]
    fn test_payload_null_counts_as_absent() {
        let payload: ContentPayload =
            serde_json::from_str(r##"{"html":null,"mdx":"# Hi"}"##).unwrap();
        assert_eq!(payload.html, None);
        assert_eq!(payload.mdx.as_deref(), Some("# Hi"));
    }

    #[test]
    fn test_payload_ignores_unknown_fields() {
        let payload: ContentPayload =
            serde_json::from_str(r#"{"title":"x","version":3}"#).unwrap();
        assert_eq!(payload, ContentPayload::default());
    }

    #[test]
    fn test_content_id_display() {
        assert_eq!(ContentId::new("42").to_string(), "42");
    }
}
