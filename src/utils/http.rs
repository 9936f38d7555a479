//! HTTP transport: the single-request boundary every resource talks through.

use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// One HTTP request relative to the API endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the endpoint, e.g. `materials/` or `materials/mp-149/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Create a POST request with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append one query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append several query parameters
    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(params);
        self
    }

    /// Value of a query parameter, if set
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    /// JSON body; a non-JSON body is kept as a string value
    pub body: Value,
}

impl TransportResponse {
    /// Build a response from a status code and body
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// Failures below the HTTP status level
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection was dropped or reset after it was established
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_request() || err.is_body() || is_connection_loss(&err) {
            TransportError::ConnectionLost(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Whether an I/O error in the source chain says the peer went away
fn is_connection_loss(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = current.source();
    }
    false
}

/// Issues single requests. Implementations must be shareable across every
/// resource client.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one request and return the status with the decoded body
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Mark the transport as finished. Implementations may free resources
    /// here; pooled connections of [`HttpTransport`] are only released when
    /// its last handle is dropped.
    fn close(&self) {}
}

/// Settings for the reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub include_user_agent: bool,
    pub timeout: Duration,
}

/// Transport backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build a client with the API key header and user agent preconfigured
    pub fn new(settings: &HttpSettings) -> Result<Self, TransportError> {
        let mut endpoint = settings.endpoint.trim().to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| TransportError::Other(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| TransportError::Other("API key is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90));

        if settings.include_user_agent {
            builder = builder.user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ));
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    /// The base endpoint every path is joined onto
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self
            .endpoint
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::Other(format!("invalid path '{}': {}", request.path, e)))?;

        tracing::debug!(method = %request.method, %url, params = request.query.len(), "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(TransportResponse::new(status, body))
    }

    fn close(&self) {
        tracing::debug!(endpoint = %self.endpoint, "closing HTTP transport");
    }
}
