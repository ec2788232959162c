//! Retrying HTTP request helper.
//!
//! A [`RequestSpec`] describes one logical call. [`RequestExecutor`] issues it
//! up to `max_attempts` times through an [`HttpTransport`], retrying only
//! transport failures (no backoff), then checks the status code and decodes
//! the body as JSON. Status and decode failures are never retried.

use std::{collections::BTreeMap, fmt, num::NonZeroU32, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{errors::Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    /// Status code a call with this method must return to count as a success.
    pub fn expected_status(self) -> u16 {
        match self {
            Method::Get | Method::Post | Method::Patch => 200,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        };
        f.write_str(s)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            other => Err(Error::InvalidRequest(format!(
                "unsupported request method: {other}"
            ))),
        }
    }
}

/// One logical HTTP call.
///
/// For GET, `params` are sent as the query string; for POST and PATCH they
/// are sent as a JSON object body.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub max_attempts: NonZeroU32,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: NonZeroU32::MIN,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget. Values below one are raised to one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidRequest("url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Response of a transport call that completed, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure. Always retried by the executor.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Seam over the HTTP library so the executor can be driven by fakes.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, TransportError>;
}

#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_err(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, TransportError> {
        let mut req = match spec.method {
            Method::Get => self.http.get(&spec.url).query(&spec.params),
            Method::Post => self.http.post(&spec.url).json(&spec.params),
            Method::Patch => self.http.patch(&spec.url).json(&spec.params),
        };
        for (name, value) in &spec.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req
            .timeout(spec.timeout)
            .send()
            .await
            .map_err(Self::map_err)?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn reqwest() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }

    /// Run the request and decode the body as loosely-typed JSON.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<serde_json::Value> {
        self.execute_as(spec).await
    }

    /// Run the request and decode the body into `T`.
    ///
    /// A body that is not JSON, or JSON that does not match `T`, fails with
    /// [`Error::Decode`].
    pub async fn execute_as<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T> {
        let body = self.execute_raw(spec).await?;
        serde_json::from_str(&body).map_err(Error::Decode)
    }

    async fn execute_raw(&self, spec: &RequestSpec) -> Result<String> {
        spec.validate()?;

        let max_attempts = spec.max_attempts.get();
        let mut response = None;
        for attempt in 1..=max_attempts {
            match self.transport.send(spec).await {
                Ok(r) => {
                    response = Some(r);
                    break;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        method = %spec.method,
                        url = %spec.url,
                        error = %e,
                        "request attempt failed"
                    );
                }
            }
        }

        let Some(response) = response else {
            return Err(Error::RetriesExhausted {
                attempts: max_attempts,
            });
        };

        let expected = spec.method.expected_status();
        if response.status != expected {
            return Err(Error::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        debug!(method = %spec.method, url = %spec.url, "request succeeded");
        Ok(response.body)
    }
}
