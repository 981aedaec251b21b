//! Blocking HTTP client for the servlet endpoints.

use reqwest::blocking::{Client, Response, multipart};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::{ContentId, ContentPayload, ContentService, ImageUpload, ServiceError, encode_form};

/// Base URL of the content service (read, upload, update).
pub const DEFAULT_CONTENT_SERVICE: &str = "http://cm.aggflow.com/cm/servlet";
/// Base URL of the read-only render service used by the viewer.
pub const DEFAULT_RENDER_SERVICE: &str = "http://localhost:8007/cm/servlet";

/// Servlet URLs derived from the two service bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    content_base: String,
    render_base: String,
}

impl Endpoints {
    pub fn new(content_base: impl Into<String>, render_base: impl Into<String>) -> Self {
        Self {
            content_base: trim_base(content_base.into()),
            render_base: trim_base(render_base.into()),
        }
    }

    pub fn content_base(&self) -> &str {
        &self.content_base
    }

    pub fn render_base(&self) -> &str {
        &self.render_base
    }

    pub fn content_url(&self, id: &ContentId) -> String {
        format!(
            "{}/GetWebpartMdxServlet?id={}",
            self.content_base,
            urlencoding::encode(id.as_str())
        )
    }

    pub fn upload_url(&self) -> String {
        format!("{}/SaveWebpartImagesServlet", self.content_base)
    }

    pub fn update_url(&self) -> String {
        format!("{}/UpdateWebpartMdxServlet", self.content_base)
    }

    pub fn render_url(&self, id: &ContentId) -> String {
        format!(
            "{}/GetWebpartTestServlet?id={}",
            self.render_base,
            urlencoding::encode(id.as_str())
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_SERVICE, DEFAULT_RENDER_SERVICE)
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[derive(Debug, Deserialize)]
struct UploadReceipt {
    #[serde(default)]
    location: Option<String>,
}

/// [`ContentService`] backed by `reqwest`'s blocking client.
///
/// Calls block the calling thread; the app only invokes them from worker
/// threads.
#[derive(Debug, Clone)]
pub struct HttpContentService {
    client: Client,
    endpoints: Endpoints,
}

impl HttpContentService {
    /// Build a client for `endpoints`.
    ///
    /// # Errors
    /// Returns [`ServiceError::Network`] if the TLS backend cannot be set up.
    pub fn new(endpoints: Endpoints) -> Result<Self, ServiceError> {
        let client = Client::builder().build()?;
        Ok(Self { client, endpoints })
    }

    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ServiceError::BadStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}

impl ContentService for HttpContentService {
    fn fetch_content(&self, id: &ContentId) -> Result<ContentPayload, ServiceError> {
        let url = self.endpoints.content_url(id);
        tracing::debug!(%url, "fetching content");
        let response = check_status(self.client.get(&url).send()?)?;
        response
            .json::<ContentPayload>()
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }

    fn upload_image(&self, image: ImageUpload) -> Result<String, ServiceError> {
        let url = self.endpoints.upload_url();
        tracing::debug!(%url, bytes = image.bytes.len(), mime = %image.mime, "uploading image");
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime)?;
        let form = multipart::Form::new().part("image", part);
        let response = check_status(self.client.post(&url).multipart(form).send()?)?;
        let receipt = response
            .json::<UploadReceipt>()
            .map_err(|err| ServiceError::Upload(err.to_string()))?;
        receipt
            .location
            .filter(|location| !location.is_empty())
            .ok_or_else(|| ServiceError::Upload("response has no location".to_string()))
    }

    fn update_content(
        &self,
        id: &ContentId,
        text: &str,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = self.endpoints.update_url();
        let body = encode_form(&[("id", id.as_str()), ("text", text)]);
        tracing::debug!(%url, bytes = body.len(), "posting content update");
        let response = check_status(
            self.client
                .post(&url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
                .send()?,
        )?;
        response
            .json::<serde_json::Value>()
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }

    fn fetch_rendered_text(&self, id: &ContentId) -> Result<String, ServiceError> {
        let url = self.endpoints.render_url(id);
        tracing::debug!(%url, "fetching rendered text");
        let response = check_status(self.client.get(&url).send()?)?;
        Ok(response.text()?)
    }
}
