// Device HTTP client
//
// Wraps `reqwest::Client` with the fan controller's four endpoints,
// per-request timeouts, and failure classification. There is no retry
// logic here; callers decide what a failure means.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{AngleRequest, DeviceStatus, ModeRequest, RelayRequest};
use crate::transport::TransportConfig;

/// Raw HTTP client for the ESP32 fan controller.
///
/// Every method performs exactly one request. A 200 response is success;
/// anything else is [`Error::HttpStatus`]. Transport failures are
/// classified by [`Error::from_reqwest`].
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    poll_timeout: Duration,
    command_timeout: Duration,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the device root, e.g. `http://192.168.100.161`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, transport))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, transport: &TransportConfig) -> Self {
        Self {
            http,
            base_url,
            poll_timeout: transport.poll_timeout,
            command_timeout: transport.command_timeout,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /` -- read the device's current state.
    pub async fn fetch_status(&self) -> Result<DeviceStatus, Error> {
        let url = self.endpoint("")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, millis(self.poll_timeout)))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, millis(self.poll_timeout)))?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// `POST /mode` -- switch between automatic and manual control.
    pub async fn set_mode(&self, automatic: bool) -> Result<(), Error> {
        self.command("mode", &ModeRequest { auto: automatic }).await
    }

    /// `POST /angle` -- move the servo. Only honoured by the firmware in
    /// manual mode.
    pub async fn set_angle(&self, angle: u8) -> Result<(), Error> {
        self.command("angle", &AngleRequest { angle }).await
    }

    /// `POST /relay` -- switch the fan relay.
    pub async fn set_relay(&self, state: bool) -> Result<(), Error> {
        self.command("relay", &RelayRequest { state }).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build `{base}/{path}`, tolerating a trailing slash on the base.
    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// POST a JSON body and require a 200. Response bodies are ignored.
    async fn command(&self, path: &str, body: &impl Serialize) -> Result<(), Error> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url.clone())
            .timeout(self.command_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, millis(self.command_timeout)))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
