use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::extract::{extract, MetricValue};
use crate::metric::MetricDescriptor;
use crate::protocol::{
    body_reports_failure, decode_payload, CONTROLLER_DATA_PATH, DEFAULT_BASE_URL, MISC_COMMAND_VALUE,
    MISC_START, MISC_STOP, UPDATE_VALUE_PATH,
};
use crate::Result;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct StokerClientBuilder {
    serial: String,
    token: String,
    base_url: String,
    timeout: Duration,
}

impl StokerClientBuilder {
    pub fn new(serial: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> StokerClient {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("failed to build HTTP client");

        StokerClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            serial: self.serial,
            token: self.token,
        }
    }
}

/// HTTP client for one controller. Covers both sides of the cloud API: the
/// telemetry read endpoint and the value-update write endpoint.
pub struct StokerClient {
    http: reqwest::Client,
    base_url: String,
    serial: String,
    token: String,
}

impl StokerClient {
    pub fn builder(
        serial: impl Into<String>,
        token: impl Into<String>,
    ) -> StokerClientBuilder {
        StokerClientBuilder::new(serial, token)
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Fetch the full telemetry tree. Fails with `Error::Http` on transport
    /// problems or a non-2xx status and `Error::Decode` when the body cannot
    /// be parsed even after the repair pass. No retries here; retry policy
    /// belongs to the coordinator.
    pub async fn fetch(&self) -> Result<Value> {
        let url = format!("{}{}", self.base_url, CONTROLLER_DATA_PATH);
        debug!(url = %url, serial = %self.serial, "fetching controller data");

        let resp = self
            .http
            .get(&url)
            .query(&[("serial", self.serial.as_str()), ("token", self.token.as_str())])
            .send()
            .await?
            .error_for_status()?;

        // Content-Type is not trustworthy; always parse the text body.
        let body = resp.text().await?;
        decode_payload(&body)
    }

    /// Fetch and extract one metric.
    pub async fn read_metric(&self, descriptor: &MetricDescriptor) -> Result<MetricValue> {
        let payload = self.fetch().await?;
        let value = extract(&payload, descriptor);
        trace!(metric = %descriptor.key, value = ?value, "extracted metric");
        Ok(value)
    }

    /// Write one remote setting. Never raises: any transport error or non-2xx
    /// status yields `false`, a 2xx response without a recognizable failure
    /// body yields `true`.
    pub async fn write(&self, menu: &str, name: &str, value: &str) -> bool {
        match self.try_write(menu, name, value).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(menu, name, value, error = %e, "write request failed");
                false
            }
        }
    }

    async fn try_write(&self, menu: &str, name: &str, value: &str) -> Result<bool> {
        let url = format!("{}{}", self.base_url, UPDATE_VALUE_PATH);
        debug!(url = %url, menu, name, value, "writing value");

        // The vendor endpoint takes commands as GET query parameters.
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("menu", menu),
                ("name", name),
                ("value", value),
                ("token", self.token.as_str()),
                ("serial", self.serial.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(menu, name, status = resp.status().as_u16(), "write rejected");
            return Ok(false);
        }

        let body = resp.text().await.unwrap_or_default();
        if body_reports_failure(&body) {
            warn!(menu, name, body = %body.trim(), "write reported failure in body");
            return Ok(false);
        }
        Ok(true)
    }

    /// Start or stop the boiler via the misc command pair.
    pub async fn set_power(&self, on: bool) -> bool {
        let name = if on { MISC_START } else { MISC_STOP };
        self.write(name, name, MISC_COMMAND_VALUE).await
    }
}
