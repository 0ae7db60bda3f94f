//! Launch telemetry
//!
//! Sends a single `app_open` event when the application starts. The event is
//! fire-and-forget: no retry, no state, and failures are only logged.

use crate::config::TelemetryConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const APP_OPEN_ENDPOINT: &str = "https://api.magicive.com/action/app_open";

const UNKNOWN_BUNDLE_IDENTIFIER: &str = "Unknown";
const UNKNOWN_APP_NAME: &str = "Unknown App";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("Error sending app open request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP Error: {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOpenEvent {
    pub bundle_identifier: String,
    pub app_name: String,
}

impl AppOpenEvent {
    /// Build the event, substituting placeholders for missing or blank values.
    pub fn new(bundle_identifier: Option<&str>, app_name: Option<&str>) -> Self {
        let pick = |value: Option<&str>, fallback: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            bundle_identifier: pick(bundle_identifier, UNKNOWN_BUNDLE_IDENTIFIER),
            app_name: pick(app_name, UNKNOWN_APP_NAME),
        }
    }

    /// Apply configured overrides on top of what the host application reports.
    pub fn from_host(config: &TelemetryConfig, bundle_identifier: &str, app_name: &str) -> Self {
        Self::new(
            config.bundle_identifier.as_deref().or(Some(bundle_identifier)),
            config.app_name.as_deref().or(Some(app_name)),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl TelemetryReporter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TelemetryError::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        Self::new(config.endpoint.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the event; anything other than `200 OK` is an error.
    pub async fn send_app_open(&self, event: &AppOpenEvent) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TelemetryError::Status(status));
        }
        Ok(())
    }

    /// Send the event and log the outcome. Returns whether it was accepted.
    pub async fn report_app_open(&self, event: &AppOpenEvent) -> bool {
        match self.send_app_open(event).await {
            Ok(()) => {
                log::info!("App open event sent successfully.");
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    /// Fire the event on the current tokio runtime without waiting for it.
    pub fn spawn_app_open(self, event: AppOpenEvent) -> tokio::task::JoinHandle<bool> {
        tokio::spawn(async move { self.report_app_open(&event).await })
    }
}
