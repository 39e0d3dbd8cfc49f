//! Image upload passthrough to the external media host.
//!
//! Uploads are forwarded as unsigned multipart posts with a preset; the
//! host's `secure_url` comes back to the client. Image bytes are never
//! stored locally.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Media host failures.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Request to the media host failed.
    #[error("media host request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The media host answered with a non-success status.
    #[error("media host rejected the upload: {0}")]
    Rejected(reqwest::StatusCode),

    /// The response had no usable URL.
    #[error("media host response missing secure_url")]
    MissingUrl,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Client for the external media host.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl MediaClient {
    #[must_use]
    pub fn new(upload_url: String, upload_preset: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url,
            upload_preset,
        }
    }

    /// Forward image bytes to the media host and return the hosted URL.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Rejected`] for a non-success response and
    /// [`MediaError::MissingUrl`] when the response carries no URL.
    pub async fn upload(
        &self,
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<String, MediaError> {
        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(content_type) = content_type {
            part = part.mime_str(&content_type)?;
        }

        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Rejected(status));
        }

        let body: UploadResponse = response.json().await?;
        body.secure_url.ok_or(MediaError::MissingUrl)
    }
}
