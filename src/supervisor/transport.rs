//! Request/response exchange with the supervisor.
//!
//! Every call is a single exchange with no retries. Failures are normalised
//! into [`BenchBotError::ConnectionFailure`] (nothing answered) or
//! [`BenchBotError::UnexpectedResponse`] (a status of 300 or above).

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{BenchBotError, Result};

/// The transport seam between the client and the supervisor.
///
/// [`HttpTransport`] talks to a live supervisor; [`super::MockSupervisor`]
/// answers in-process for tests and dry runs.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Read the resource at `address` and decode its JSON body.
    async fn fetch(&self, address: &str) -> Result<Value>;

    /// Deliver `payload` to `address`. The response body is ignored.
    async fn send(&self, address: &str, payload: &Value) -> Result<()>;
}

/// HTTP transport backed by [`reqwest::Client`].
///
/// Both operations are issued as `GET`; `send` carries its payload as a JSON
/// body, which is what the supervisor's connection routes expect.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport. `timeout` bounds each request; `None` leaves
    /// requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(BenchBotError::ClientBuild)?;
        Ok(Self { http })
    }

    async fn exchange(&self, address: &str, payload: Option<&Value>) -> Result<reqwest::Response> {
        let mut request = self.http.get(address);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| BenchBotError::connection(address, e.to_string()))?;

        let status = resp.status();
        debug!(address, status = status.as_u16(), "supervisor responded");
        if status.as_u16() >= 300 {
            return Err(BenchBotError::UnexpectedResponse {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, address: &str) -> Result<Value> {
        let resp = self.exchange(address, None).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| BenchBotError::malformed(address, e.to_string()))
    }

    async fn send(&self, address: &str, payload: &Value) -> Result<()> {
        self.exchange(address, Some(payload)).await?;
        Ok(())
    }
}
