//! Telemetry sink: POST each reading to a device telemetry endpoint.
//!
//! The endpoint is addressed by device access token:
//! `{base}/api/v1/{token}/telemetry`, body is the reading as a flat JSON
//! object. Failures are reported to the dispatcher, never retried.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::dispatch::{Observer, ObserverError};
use crate::model::SensorReading;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelemetryObserver {
    client: reqwest::Client,
    url: String,
}

impl TelemetryObserver {
    pub fn new(base_url: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: telemetry_url(base_url, token),
        }
    }
}

fn telemetry_url(base_url: &str, token: &str) -> String {
    format!("{}/api/v1/{token}/telemetry", base_url.trim_end_matches('/'))
}

#[async_trait]
impl Observer for TelemetryObserver {
    fn name(&self) -> &str {
        "telemetry"
    }

    async fn on_new_read(&self, reading: &SensorReading) -> Result<(), ObserverError> {
        let response = self.client.post(&self.url).json(reading).send().await?;
        let status = response.status();
        if status.as_u16() > 299 {
            let body = response.text().await.unwrap_or_default();
            return Err(ObserverError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(time = reading.time, status = status.as_u16(), "telemetry accepted");
        Ok(())
    }
}
