// Timeout-bounded HTTP transport.
//
// One `reqwest::Client` is shared by plain requests and event-stream
// connections, so the per-request bound is applied around each exchange
// instead of on the client (a client-wide timeout would cut streams off).

use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::requests::ApiRequest;

/// Default bound on a single request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100_000);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("firelink/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(Error::Network)
    }
}

/// Raw HTTP client for device and master endpoints.
///
/// Performs exactly one attempt per call. Never retries.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            timeout: config.timeout,
        })
    }

    /// Wrap a pre-built `reqwest::Client` (tests, custom TLS setups).
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// The underlying HTTP client (event streams reuse it).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Send `request` against `base` and return the parsed JSON body.
    ///
    /// A 2xx answer with an empty body yields `Value::Null`.
    pub async fn send(&self, base: &Url, request: &ApiRequest) -> Result<Value, Error> {
        let url = join(base, request.path)?;
        let timeout_ms = self.timeout_ms();

        match tokio::time::timeout(self.timeout, self.exchange(url.clone(), request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%url, timeout_ms, "request timed out");
                Err(Error::Timeout { timeout_ms })
            }
        }
    }

    /// Send `request` and deserialize the success payload into `T`.
    pub async fn send_typed<T: DeserializeOwned>(
        &self,
        base: &Url,
        request: &ApiRequest,
    ) -> Result<T, Error> {
        let value = self.send(base, request).await?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    async fn exchange(&self, url: Url, request: &ApiRequest) -> Result<Value, Error> {
        debug!("{} {}", request.method, url);
        let timeout_ms = self.timeout_ms();

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if request.method != Method::GET {
            let body = request
                .body
                .as_ref()
                .map_or_else(|| "{}".to_owned(), Value::to_string);
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            Error::from_reqwest(e, timeout_ms)
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).ok();
            warn!(%url, status = status.as_u16(), "device rejected request");
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text,
        })
    }
}

/// Append an absolute endpoint path to a base URL, keeping any base path prefix.
pub fn join(base: &Url, path: &str) -> Result<Url, Error> {
    let full = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Ok(Url::parse(&full)?)
}
