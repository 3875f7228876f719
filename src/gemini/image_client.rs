use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    config::GeminiConfig,
    error::{Result, TryOnError},
    models::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse},
};

use super::GenerationBackend;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` over HTTPS.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                TryOnError::Config("GEMINI_API_KEY (or API_KEY) is not set".into())
            })?;

        Ok(Self {
            http: Client::new(),
            endpoint: config.endpoint(),
            api_key,
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        log::info!("Generating try-on image with model: {}", self.model);

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request to {} failed: {:?}", self.endpoint, e);
                TryOnError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            log::error!("Failed to read Gemini response body: {:?}", e);
            TryOnError::Transport(e.to_string())
        })?;

        if !status.is_success() {
            let err = classify_http_failure(status, &body);
            log::error!("Gemini returned HTTP {}: {}", status, body);
            return Err(err);
        }

        log::debug!("Gemini response: {} bytes", body.len());
        serde_json::from_str(&body).map_err(|e| {
            log::error!("Gemini response was not valid JSON: {}", e);
            TryOnError::MalformedResponse
        })
    }
}

/// Maps a non-2xx reply onto `Auth` or `Transport`.
///
/// Google reports a bad key as HTTP 400 with `API key not valid` in the
/// message and `API_KEY_INVALID` in the details, so the body is checked as
/// well as the status.
pub fn classify_http_failure(status: StatusCode, body: &str) -> TryOnError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error);
    let message = detail
        .as_ref()
        .and_then(|detail| detail.message.clone())
        .unwrap_or_else(|| body.trim().to_string());
    let remote_status = detail
        .as_ref()
        .and_then(|detail| detail.status.as_deref())
        .unwrap_or_default();

    let auth_failure = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || matches!(remote_status, "UNAUTHENTICATED" | "PERMISSION_DENIED")
        || message.contains("API key not valid")
        || body.contains("API_KEY_INVALID");

    if auth_failure {
        TryOnError::Auth(message)
    } else {
        TryOnError::Transport(format!("HTTP {}: {}", status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let result = GeminiClient::new(&GeminiConfig::new());
        assert!(matches!(result, Err(TryOnError::Config(_))));

        let result = GeminiClient::new(&GeminiConfig::new().with_api_key("   "));
        assert!(matches!(result, Err(TryOnError::Config(_))));
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = GeminiConfig::new()
            .with_api_key("test-key")
            .with_api_base("http://127.0.0.1:9/v1beta");
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_invalid_key_body_is_auth() {
        let body = r#"{
          "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{ "reason": "API_KEY_INVALID" }]
          }
        }"#;
        let err = classify_http_failure(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err,
            TryOnError::Auth("API key not valid. Please pass a valid API key.".into())
        );
    }

    #[test]
    fn test_forbidden_is_auth() {
        let err = classify_http_failure(StatusCode::FORBIDDEN, "denied");
        assert!(matches!(err, TryOnError::Auth(_)));
    }

    #[test]
    fn test_server_error_is_transport() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        let err = classify_http_failure(StatusCode::SERVICE_UNAVAILABLE, body);
        assert_eq!(
            err,
            TryOnError::Transport("HTTP 503: The model is overloaded.".into())
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport() {
        let config = GeminiConfig::new()
            .with_api_key("test-key")
            .with_api_base("http://127.0.0.1:9/v1beta");
        let client = GeminiClient::new(&config).unwrap();
        let person = crate::models::EncodedImage::new("AAAA", "image/png").unwrap();
        let request = GenerateContentRequest::try_on(&person, &person, "prompt");

        let result = client.generate_content(&request).await;
        assert!(matches!(result, Err(TryOnError::Transport(_))));
    }
}
