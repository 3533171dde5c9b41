//! SEMSTORM monitoring API client.
//!
//! One POST per run to the campaign data endpoint. Anything other than an
//! HTTP 200 means there is no data for this run.

use crate::config::ApiConfig;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Request body of the campaign data endpoint.
#[derive(Debug, Serialize)]
struct CampaignDataRequest<'a> {
    id: u64,
    services_token: &'a str,
}

/// Client for the monitoring campaign endpoint.
pub struct MonitoringClient {
    url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl MonitoringClient {
    /// Create a client from the API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: config.url.clone(),
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    /// Fetch the raw campaign payload.
    ///
    /// Returns `Ok(None)` when the API answers with anything but 200.
    pub async fn fetch_keyword_data(&self, campaign_id: u64, token: &str) -> Result<Option<Value>> {
        info!("Fetching campaign {} from {}", campaign_id, self.url);

        let request = CampaignDataRequest {
            id: campaign_id,
            services_token: token,
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to monitoring API at {}", self.url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Monitoring API returned {}: {}", status, truncate(&body, 200));
            return Ok(None);
        }

        let payload: Value = response
            .json()
            .await
            .context("Failed to parse monitoring API response")?;

        debug!("Received payload for campaign {}", campaign_id);
        Ok(Some(payload))
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
