//! Client for the remote face verification service.
//!
//! `POST {api_base}/face/verify-quick` with a multipart `image` field carrying
//! the JPEG as `face.jpg`. The service answers with
//! `{ success, match, teacher_id, score, message }`.

use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("verification request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("verification service returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed verification response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Response body of the quick verification endpoint.
///
/// `success`, `match` and `message` are required: a body without them is a
/// malformed response, not a failed match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(rename = "match")]
    pub matched: bool,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    pub message: String,
}

impl VerifyResponse {
    /// The matched teacher, only when the service confirmed a match with a
    /// non-empty id.
    pub fn matched_teacher(&self) -> Option<&str> {
        if !self.matched {
            return None;
        }
        self.teacher_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Something that can match a face image against enrolled faces.
pub trait Verifier {
    fn verify(
        &self,
        jpeg: Vec<u8>,
    ) -> impl Future<Output = Result<VerifyResponse, VerifyError>> + Send;
}

/// [`Verifier`] backed by the HTTP verification service.
#[derive(Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    url: String,
}

impl HttpVerifier {
    /// `url` is the full endpoint, see [`crate::Config::verify_url`].
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(VerifyError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Verifier for HttpVerifier {
    async fn verify(&self, jpeg: Vec<u8>) -> Result<VerifyResponse, VerifyError> {
        let size = jpeg.len();
        let part = Part::bytes(jpeg)
            .file_name("face.jpg")
            .mime_str("image/jpeg")
            .map_err(VerifyError::Transport)?;
        let form = Form::new().part("image", part);

        tracing::debug!(url = %self.url, bytes = size, "submitting face for verification");

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(VerifyError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::Status {
                status: status.as_u16(),
            });
        }

        response.json::<VerifyResponse>().await.map_err(VerifyError::Decode)
    }
}
