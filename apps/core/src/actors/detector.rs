use crate::actors::messages::AppError;
use crate::actors::traits::DetectionClient;
use crate::config::Config;
use crate::models::AnalysisResult;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

/// Body sent by the popup's liveness probe.
pub const PROBE_PROMPT: &str = "test";

/// HTTP client for the hallucination detection service.
#[derive(Clone)]
pub struct HttpDetectionClient {
    client: Client,
    detect_url: String,
    request_timeout: Duration,
}

impl HttpDetectionClient {
    pub fn new(config: &Config) -> Self {
        Self::with_url(config.detect_url(), config.request_timeout)
    }

    pub fn with_url(detect_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            detect_url: detect_url.into(),
            request_timeout,
        }
    }

    fn build_request(&self, prompt: &str) -> reqwest::RequestBuilder {
        self.client
            .post(&self.detect_url)
            .json(&serde_json::json!({ "prompt": prompt }))
    }

    /// Posts `prompt` and reads the whole reply body under one `request_timeout`.
    async fn post_prompt(&self, prompt: &str) -> Result<String, AppError> {
        timeout(self.request_timeout, self.exchange(prompt)).await?
    }

    async fn exchange(&self, prompt: &str) -> Result<String, AppError> {
        let res = self.build_request(prompt).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.text().await?)
    }
}

#[async_trait]
impl DetectionClient for HttpDetectionClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn detect(&self, text: String) -> Result<AnalysisResult, AppError> {
        info!("Calling detection service at {}", self.detect_url);

        let body = self.post_prompt(&text).await.map_err(|e| {
            error!("Detection request failed: {}", e);
            e
        })?;

        let result: AnalysisResult = serde_json::from_str(&body).map_err(|e| {
            warn!("Malformed detection response: {}", e);
            AppError::Validation(format!("Malformed response from detection service: {}", e))
        })?;

        info!(
            "Detection finished: is_correct={} confidence={}%",
            result.is_correct,
            result.confidence_percent()
        );
        Ok(result)
    }

    async fn probe(&self) -> Result<(), AppError> {
        self.post_prompt(PROBE_PROMPT).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    const ENDPOINT: &str = "/api/v1/detect-hallucination";

    fn client_for(server: &MockServer, request_timeout: Duration) -> HttpDetectionClient {
        HttpDetectionClient::with_url(format!("{}{}", server.uri(), ENDPOINT), request_timeout)
    }

    #[tokio::test]
    async fn test_detect_success() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(body_json(json!({ "prompt": "The Moon is made of cheese." })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_correct": false,
                "confidence": 0.99,
                "corrected_version": "The Moon is made of rock.",
                "explanation": "Lunar samples are silicate rock."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = client_for(&mock_server, Duration::from_secs(5))
            .detect("The Moon is made of cheese.".to_string())
            .await;

        // 3. Assert
        let result = result.unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.corrected_version, "The Moon is made of rock.");
    }

    #[tokio::test]
    async fn test_detect_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server, Duration::from_secs(5))
            .detect("Hello".to_string())
            .await;

        match result {
            Err(AppError::Remote { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("Internal Server Error"));
            }
            other => panic!("Expected AppError::Remote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detect_malformed_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server, Duration::from_secs(5))
            .detect("Hello".to_string())
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_detect_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "is_correct": true }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server, Duration::from_millis(100))
            .detect("Hello".to_string())
            .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_slow_headers_and_slow_body_share_one_deadline() {
        // Headers after 250ms, body after another 250ms: each phase fits in
        // 400ms, the whole exchange does not.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"is_correct":true,"confidence":0.9}"#;
            sleep(Duration::from_millis(250)).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            sleep(Duration::from_millis(250)).await;
            let _ = socket.write_all(body.as_bytes()).await;
            sleep(Duration::from_millis(500)).await;
        });

        let client = HttpDetectionClient::with_url(format!("http://{}{}", addr, ENDPOINT), Duration::from_millis(400));
        let result = client.detect("Hello".to_string()).await;

        assert!(matches!(result, Err(AppError::Timeout(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_detect_unreachable_server() {
        // Nothing listens on port 9 of the loopback interface.
        let client = HttpDetectionClient::with_url("http://127.0.0.1:9/api/v1/detect-hallucination", Duration::from_secs(5));

        let result = client.detect("Hello".to_string()).await;

        match result {
            Err(AppError::Http { connect, .. }) => assert!(connect),
            other => panic!("Expected AppError::Http, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_sends_fixed_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(body_json(json!({ "prompt": "test" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ignored"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server, Duration::from_secs(5)).probe().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_probe_fails_on_non_2xx() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server, Duration::from_secs(5)).probe().await;
        assert!(matches!(result, Err(AppError::Remote { status: 404, .. })));
    }
}
