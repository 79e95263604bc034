//! reqwest-backed registration backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use openday_core::{ProbeOutcome, RecordPayload, RegistrationBackend, ServerAck, SubmitError};

/// Configuration for the HTTP backend
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the registration API, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Overall bound on a submission request
    pub request_timeout: Duration,
    /// Bound on one liveness probe; kept short so a dead backend is
    /// noticed within a few probe cycles
    pub probe_timeout: Duration,
    /// Bearer token attached to submissions, when the deployment
    /// requires one
    pub bearer_token: Option<String>,
}

impl HttpBackendConfig {
    /// Create a config for the given API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            bearer_token: None,
        }
    }

    /// Set the submission timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Attach a bearer token to submissions
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Shape of the liveness endpoint's answer
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// HTTP implementation of [`RegistrationBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Build a backend from the given config
    pub fn new(config: HttpBackendConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Whether a transport error implicates the network rather than the
/// application
///
/// Conservative on purpose: only errors with no HTTP answer at all count,
/// and malformed-response errors are excluded, so an ambiguous failure is
/// surfaced instead of silently queued.
fn is_network_shaped(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    // Request/response construction and body-decode problems are not the
    // network's fault
    if error.is_builder() || error.is_decode() {
        return false;
    }
    error.status().is_none()
}

fn classify(error: reqwest::Error) -> SubmitError {
    if is_network_shaped(&error) {
        SubmitError::Network(error.to_string())
    } else if let Some(status) = error.status() {
        SubmitError::Rejected {
            status: status.as_u16(),
            detail: error.to_string(),
        }
    } else {
        SubmitError::Protocol(error.to_string())
    }
}

/// Pull the human-readable detail out of an API error body
///
/// The API answers rejections with `{"detail": ...}` where detail is a
/// string or a list of field errors.
fn rejection_detail(body: Option<serde_json::Value>, status: reqwest::StatusCode) -> String {
    body.as_ref()
        .and_then(|v| v.get("detail"))
        .map(|detail| match detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string()
        })
}

#[async_trait]
impl<P: RecordPayload> RegistrationBackend<P> for HttpBackend {
    async fn submit_record(&self, payload: &P) -> Result<ServerAck, SubmitError> {
        let response = self
            .authorize(self.client.post(self.url("/api/students")))
            .json(payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json()
                .await
                .map_err(|e| SubmitError::Protocol(e.to_string()))?;
            debug!(status = status.as_u16(), "Record accepted");
            return Ok(ServerAck {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json::<serde_json::Value>().await.ok();
        let detail = rejection_detail(body, status);
        debug!(status = status.as_u16(), detail = %detail, "Record rejected");
        Err(SubmitError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn check_health(&self) -> ProbeOutcome {
        let result = self
            .client
            .get(self.url("/api/health"))
            .timeout(self.config.probe_timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if is_network_shaped(&e) => {
                debug!(error = %e, "Health probe unreachable");
                return ProbeOutcome::Unreachable;
            }
            Err(e) => {
                warn!(error = %e, "Health probe failed without implicating the network");
                return ProbeOutcome::Degraded;
            }
        };

        if !response.status().is_success() {
            return ProbeOutcome::Degraded;
        }

        // A bare success status is not proof of health; a captive portal
        // or proxy can answer 200 to anything
        match response.json::<HealthResponse>().await {
            Ok(health) if health.status == "ok" => ProbeOutcome::Healthy,
            _ => ProbeOutcome::Degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use openday_core::RegistrationRecord;

    use super::*;

    /// Serve one canned HTTP response, returning the base URL
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        format!("http://{addr}")
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn backend_for(base_url: String) -> HttpBackend {
        HttpBackend::new(
            HttpBackendConfig::new(base_url).with_probe_timeout(Duration::from_millis(200)),
        )
    }

    #[tokio::test]
    async fn test_healthy_probe() {
        let base = serve_once(http_response("200 OK", r#"{"status": "ok", "timestamp": true}"#))
            .await;
        let backend = backend_for(base);

        assert_eq!(RegistrationBackend::<RegistrationRecord>::check_health(&backend).await, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn test_success_with_unrecognized_body_is_degraded() {
        let base = serve_once(http_response("200 OK", r#"{"hello": "world"}"#)).await;
        let backend = backend_for(base);

        assert_eq!(RegistrationBackend::<RegistrationRecord>::check_health(&backend).await, ProbeOutcome::Degraded);
    }

    #[tokio::test]
    async fn test_error_status_is_degraded_not_unreachable() {
        let base = serve_once(http_response(
            "500 Internal Server Error",
            r#"{"detail": "boom"}"#,
        ))
        .await;
        let backend = backend_for(base);

        // The server answered: the network is not implicated
        assert_eq!(RegistrationBackend::<RegistrationRecord>::check_health(&backend).await, ProbeOutcome::Degraded);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind to learn a free port, then close it again
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend_for(format!("http://{addr}"));
        assert_eq!(RegistrationBackend::<RegistrationRecord>::check_health(&backend).await, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_hung_probe_times_out_as_unreachable() {
        // Accept the connection but never answer
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(stream);
            }
        });

        let backend = backend_for(format!("http://{addr}"));
        assert_eq!(RegistrationBackend::<RegistrationRecord>::check_health(&backend).await, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_submit_accepted() {
        let base = serve_once(http_response(
            "201 Created",
            r#"{"id": 42, "first_name": "Zeynep", "last_name": "Demir"}"#,
        ))
        .await;
        let backend = backend_for(base);

        let ack = backend
            .submit_record(&RegistrationRecord::new("Zeynep", "Demir"))
            .await
            .unwrap();

        assert_eq!(ack.status, 201);
        assert_eq!(ack.record_id(), Some(42));
    }

    #[tokio::test]
    async fn test_submit_rejection_carries_detail() {
        let base = serve_once(http_response(
            "400 Bad Request",
            r#"{"detail": "Department not found"}"#,
        ))
        .await;
        let backend = backend_for(base);

        let error = backend
            .submit_record(&RegistrationRecord::new("Ali", "Kaya"))
            .await
            .unwrap_err();

        match error {
            SubmitError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Department not found");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_connection_refused_is_network() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend_for(format!("http://{addr}"));
        let error = backend
            .submit_record(&RegistrationRecord::new("Ali", "Kaya"))
            .await
            .unwrap_err();

        assert!(error.is_network());
    }

    #[test]
    fn test_rejection_detail_variants() {
        let status = reqwest::StatusCode::UNPROCESSABLE_ENTITY;

        let plain = rejection_detail(
            Some(serde_json::json!({"detail": "Invalid email format"})),
            status,
        );
        assert_eq!(plain, "Invalid email format");

        let field_errors = rejection_detail(
            Some(serde_json::json!({"detail": [{"loc": ["body", "email"], "msg": "invalid"}]})),
            status,
        );
        assert!(field_errors.contains("email"));

        let missing = rejection_detail(None, status);
        assert_eq!(missing, "Unprocessable Entity");
    }

    #[test]
    fn test_base_url_trailing_slash_is_tolerated() {
        let backend = HttpBackend::new(HttpBackendConfig::new("http://localhost:8000/"));
        assert_eq!(
            backend.url("/api/health"),
            "http://localhost:8000/api/health"
        );
    }
}
