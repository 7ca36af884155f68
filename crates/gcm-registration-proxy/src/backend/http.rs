//! REST client for the messaging backend.

use super::MessagingBackend;
use crate::error::BackendError;
use crate::sender_ids::SenderIdSet;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Messaging backend reached over HTTP.
#[derive(Clone)]
pub struct HttpMessagingBackend {
    client: Client,
    base_url: String,
    app_id: String,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    app_id: &'a str,
    sender_ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    registration_id: String,
}

impl HttpMessagingBackend {
    /// Create a new backend client for `app_id`.
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        })
    }

    /// Check if the backend is reachable.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl MessagingBackend for HttpMessagingBackend {
    #[instrument(skip(self), fields(app_id = %self.app_id))]
    async fn register(&self, sender_ids: &SenderIdSet) -> Result<String, BackendError> {
        let url = format!("{}/v1/register", self.base_url);
        let body = RegisterRequest {
            app_id: &self.app_id,
            sender_ids: sender_ids.iter().collect(),
        };

        debug!(url = %url, "Sending registration request");

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Backend registration failed");

            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RegisterResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse register response: {}", e))
        })?;

        if parsed.registration_id.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "empty registration id".to_string(),
            ));
        }

        debug!("Registration request succeeded");
        Ok(parsed.registration_id)
    }

    #[instrument(skip(self), fields(app_id = %self.app_id))]
    async fn unregister(&self) -> Result<(), BackendError> {
        let url = format!("{}/v1/unregister/{}", self.base_url, encode(&self.app_id));

        debug!(url = %url, "Sending unregister request");

        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Backend unregister failed");

            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Unregister succeeded");
        Ok(())
    }
}
