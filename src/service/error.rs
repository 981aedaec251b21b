use thiserror::Error;

/// Failures talking to the content service.
///
/// None of these is fatal: callers log them and keep their prior state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("network failure: {0}")]
    Network(String),
    /// The service answered with a non-OK status.
    #[error("unexpected status {status} {reason}")]
    BadStatus { status: u16, reason: String },
    /// The content record carries neither `html` nor `mdx`.
    #[error("response carries neither `html` nor `mdx`")]
    MissingField,
    /// The image endpoint gave back no usable location.
    #[error("image upload failed: {0}")]
    Upload(String),
    /// The body could not be read as the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
