use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{Envelope, RemoteForm, RemoteSubmission};

#[derive(Debug, Error)]
pub enum FormApiError {
    #[error("form provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("form provider returned HTTP {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("form provider response missing content: {0}")]
    BadPayload(#[from] serde_json::Error),
}

/// Client for the form-submission provider.
///
/// Unlike the portal client, failures here are real errors: the sync job has
/// nothing useful to do without the provider and aborts on them.
#[derive(Debug, Clone)]
pub struct FormApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    form_id: String,
}

impl FormApiClient {
    pub fn new(base_url: &str, api_key: &str, form_id: &str) -> Result<Self, FormApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            form_id: form_id.to_string(),
        })
    }

    /// Fetch the live submissions for the configured form. Entries the
    /// provider has soft-deleted are excluded server-side via the filter so
    /// reconciliation treats them the same as entries that disappeared.
    pub async fn fetch_submissions(&self) -> Result<Vec<RemoteSubmission>, FormApiError> {
        let filter = json!({"status:ne": "DELETED"}).to_string();
        let url = format!("{}/form/{}/submissions", self.base_url, self.form_id);
        debug!(%url, "fetching form submissions");

        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("filter", filter.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FormApiError::UnexpectedStatus { status, body });
        }

        let envelope: Envelope<Vec<RemoteSubmission>> = serde_json::from_str(&body)?;
        debug!(count = envelope.content.len(), "fetched form submissions");
        Ok(envelope.content)
    }

    /// Fetch form metadata, used by diagnostics to verify credentials.
    pub async fn fetch_form(&self) -> Result<RemoteForm, FormApiError> {
        let url = format!("{}/form/{}", self.base_url, self.form_id);
        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FormApiError::UnexpectedStatus { status, body });
        }

        let envelope: Envelope<RemoteForm> = serde_json::from_str(&body)?;
        Ok(envelope.content)
    }
}
