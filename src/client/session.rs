//! Shared HTTP session used by every resource client.

use http::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::resters::ResterError;
use crate::utils::{HttpSettings, HttpTransport, Transport, TransportRequest, TransportResponse};

/// Transport plus credentials, created once by the facade and shared by all
/// resource clients.
///
/// Closing is idempotent: [`Transport::close`] runs on the first call only,
/// and every later request fails with [`ResterError::Closed`]. Sockets pooled
/// by the HTTP transport stay open until the last `Arc` to it is dropped.
#[derive(Debug)]
pub struct Session {
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
    closed: AtomicBool,
}

impl Session {
    /// Create a session over an existing transport
    pub fn new(transport: Arc<dyn Transport>, api_key: Option<String>) -> Self {
        Self {
            transport,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a session backed by a pooled HTTP client
    pub fn http(settings: &HttpSettings) -> Result<Self, ResterError> {
        let transport = HttpTransport::new(settings)?;
        Ok(Self::new(Arc::new(transport), settings.api_key.clone()))
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether [`Session::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send an authenticated request on behalf of `resource`
    pub async fn send(
        &self,
        resource: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, ResterError> {
        if !self.has_credentials() {
            return Err(ResterError::Auth(format!(
                "no API key configured for requests to '{}'",
                resource
            )));
        }
        self.send_public(request).await
    }

    /// Send a request that does not need credentials (e.g. the heartbeat)
    pub async fn send_public(
        &self,
        request: &TransportRequest,
    ) -> Result<TransportResponse, ResterError> {
        if self.is_closed() {
            return Err(ResterError::Closed);
        }
        Ok(self.transport.send(request).await?)
    }

    /// Stop accepting requests and notify the transport. Returns `true` if
    /// this call closed the session.
    ///
    /// This does not tear down pooled connections; they are released when
    /// the last handle to the transport is dropped.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!("closing session");
        self.transport.close();
        true
    }
}

/// Pull a human readable message out of an error body
pub(crate) fn error_message(body: &Value) -> String {
    if let Some(detail) = body.get("detail") {
        return match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    if let Some(message) = body
        .get("errors")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }
    match body {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a failed status to the error taxonomy. `subject` names what was being
/// fetched: an identifier for lookups, the query string for searches.
pub(crate) fn status_error(resource: &str, subject: &str, status: u16, message: String) -> ResterError {
    let Ok(code) = StatusCode::from_u16(status) else {
        return ResterError::Server { status, message };
    };

    match code {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResterError::Auth(if message.is_empty() {
            format!("request to '{}' was rejected ({})", resource, status)
        } else {
            message
        }),
        StatusCode::NOT_FOUND => ResterError::NotFound {
            resource: resource.to_string(),
            id: subject.to_string(),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ResterError::Validation {
            resource: resource.to_string(),
            message: if message.is_empty() {
                format!("query rejected: {}", subject)
            } else {
                message
            },
        },
        StatusCode::TOO_MANY_REQUESTS => ResterError::TransientServer {
            status: Some(status),
            timeout: false,
            message,
        },
        code if code.is_server_error() => ResterError::TransientServer {
            status: Some(status),
            timeout: code == StatusCode::GATEWAY_TIMEOUT,
            message,
        },
        _ => ResterError::Server { status, message },
    }
}

/// Return the body of a successful response, or the classified error
pub(crate) fn check_status(
    resource: &str,
    subject: &str,
    response: TransportResponse,
) -> Result<Value, ResterError> {
    if response.status.is_success() {
        return Ok(response.body);
    }

    let message = error_message(&response.body);
    tracing::debug!(
        resource,
        status = response.status.as_u16(),
        %message,
        "request failed"
    );
    Err(status_error(resource, subject, response.status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use serde_json::json;

    fn session(transport: Arc<MockTransport>, key: Option<&str>) -> Session {
        Session::new(transport, key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let session = session(transport.clone(), Some("  "));

        let result = session.send("materials", &TransportRequest::get("materials/")).await;
        assert!(matches!(result, Err(ResterError::Auth(_))));
        assert_eq!(transport.request_count(), 0);

        let heartbeat = session.send_public(&TransportRequest::get("heartbeat")).await;
        assert!(heartbeat.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let session = session(transport.clone(), Some("key"));

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(transport.close_count(), 1);

        let result = session.send("materials", &TransportRequest::get("materials/")).await;
        assert!(matches!(result, Err(ResterError::Closed)));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error("materials", "mp-1", 404, String::new()),
            ResterError::NotFound { ref id, .. } if id == "mp-1"
        ));
        assert!(matches!(
            status_error("materials", "", 403, String::new()),
            ResterError::Auth(_)
        ));
        assert!(matches!(
            status_error("materials", "", 422, "bad field".to_string()),
            ResterError::Validation { ref message, .. } if message == "bad field"
        ));
        assert!(matches!(
            status_error("materials", "", 429, String::new()),
            ResterError::TransientServer { status: Some(429), .. }
        ));
        assert!(matches!(
            status_error("materials", "", 504, String::new()),
            ResterError::TransientServer { timeout: true, .. }
        ));
        assert!(matches!(
            status_error("materials", "", 302, String::new()),
            ResterError::Server { status: 302, .. }
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(&json!({"detail": "Item not found"})), "Item not found");
        assert_eq!(
            error_message(&json!({"errors": [{"code": 500, "message": "boom"}]})),
            "boom"
        );
        assert_eq!(error_message(&json!("Bad Gateway")), "Bad Gateway");
    }
}
