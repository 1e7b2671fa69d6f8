//! HTTP client for the game backend API.
//!
//! Each virtual user owns one [`ApiClient`]. A call sends exactly one
//! request and records the request line, payload, and response body to the
//! active tracing subscriber.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{info, warn};

use crate::loadtest::error::StepError;

/// Status code every step treats as success.
pub const STATUS_OK: u16 = 200;

/// Response of one step request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Returns `true` for HTTP 200.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Parses the body and returns its `data` member (`Null` when absent).
    pub fn json_data(&self) -> Result<Value, StepError> {
        let mut value: Value =
            serde_json::from_str(&self.body).map_err(|e| StepError::Decode {
                message: e.to_string(),
            })?;
        Ok(value.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }
}

/// Game backend client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Creates a client. The underlying [`Client`] is cheap to clone and
    /// shares its connection pool across virtual users.
    pub fn new(http: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request.
    ///
    /// `token` becomes an `Authorization: Bearer` header when present; `body`
    /// is sent as JSON when present. Any status code is returned as a
    /// response; only transport and body-read failures are errors.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, StepError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = StepError::classify_reqwest(&e);
            warn!("[{method}] {path} -> {err}");
            log_payload(body);
            err
        })?;
        let status = response.status().as_u16();
        info!(%status, "[{method}] {path} -> Status: {status}");
        log_payload(body);

        let text = response.text().await.map_err(|e| {
            let err = StepError::classify_reqwest(&e);
            warn!("Response: unreadable body ({err})");
            err
        })?;
        info!("Response: {text}");

        Ok(ApiResponse { status, body: text })
    }
}

fn log_payload(body: Option<&Value>) {
    if let Some(body) = body {
        info!("Payload: {body}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tracing::instrument::WithSubscriber;

    /// In-memory log writer shared with a test subscriber.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capturing_subscriber(log: &CapturedLog) -> impl tracing::Subscriber + Send + Sync {
        let log = log.clone();
        tracing_subscriber::fmt()
            .with_writer(move || log.clone())
            .with_ansi(false)
            .finish()
    }

    fn client_for(url: &str) -> ApiClient {
        ApiClient::new(Client::new(), url, Duration::from_secs(5))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = client_for("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_json_data_extracts_data_member() {
        let response = ApiResponse {
            status: 200,
            body: r#"{"success":true,"data":{"matchId":"M1"}}"#.to_string(),
        };
        assert_eq!(response.json_data().unwrap(), json!({"matchId": "M1"}));
    }

    #[test]
    fn test_json_data_missing_is_null() {
        let response = ApiResponse {
            status: 200,
            body: r#"{"success":true}"#.to_string(),
        };
        assert_eq!(response.json_data().unwrap(), Value::Null);
    }

    #[test]
    fn test_json_data_invalid_body_is_decode_error() {
        let response = ApiResponse {
            status: 200,
            body: "<html>".to_string(),
        };
        assert!(matches!(
            response.json_data().unwrap_err(),
            StepError::Decode { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_attaches_bearer_and_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/rewards/daily/claim")
            .match_header("authorization", "Bearer T")
            .match_body(mockito::Matcher::Json(json!({"userId": "U"})))
            .with_status(200)
            .with_body(r#"{"data":{}}"#)
            .create_async()
            .await;

        let response = client_for(&server.url())
            .send(
                Method::POST,
                "/api/v1/rewards/daily/claim",
                Some("T"),
                Some(&json!({"userId": "U"})),
            )
            .await
            .unwrap();

        assert!(response.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_without_token_omits_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/home")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let response = client_for(&server.url())
            .send(Method::GET, "/api/v1/home", None, None)
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body, "unauthorized");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_server_error_is_a_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/gameplay/join")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let response = client_for(&server.url())
            .send(Method::POST, "/api/v1/gameplay/join", Some("T"), None)
            .await
            .expect("non-200 statuses are returned, not raised");

        assert!(!response.is_ok());
        assert_eq!(response.status, 503);
        assert_eq!(response.body, "maintenance");
    }

    #[tokio::test]
    async fn test_send_logs_request_line_when_body_is_truncated() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"data\"")
                .await
                .unwrap();
            // Closing here leaves the body 93 bytes short.
        });

        let log = CapturedLog::default();
        let err = client_for(&format!("http://{addr}"))
            .send(
                Method::POST,
                "/api/v1/auth/validate",
                Some("T"),
                Some(&json!({"userId": "U"})),
            )
            .with_subscriber(capturing_subscriber(&log))
            .await
            .unwrap_err();

        assert_eq!(err.error_category(), "decode");
        let contents = log.contents();
        assert!(
            contents.contains("[POST] /api/v1/auth/validate -> Status: 200"),
            "request line missing: {contents}"
        );
        assert!(contents.contains(r#"Payload: {"userId":"U"}"#), "payload missing: {contents}");
        assert!(contents.contains("unreadable body"), "body failure missing: {contents}");
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        let err = client_for("http://127.0.0.1:1")
            .send(Method::GET, "/api/v1/home", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_category(), "connection");
    }
}
