use crate::llm_provider::*;
use crate::AnalysisError;
use async_trait::async_trait;
use collecthub_core::{AnalysisConfig, CollectHubError};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; `None` or empty fails every call with `MissingCredential`
    pub api_key: Option<SecretString>,
    /// Base URL up to and including the API version segment
    pub api_base: String,
    /// Model to use (e.g., "gemini-2.0-flash")
    pub model: String,
    /// Request timeout, covering connect through body read
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: GEMINI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&AnalysisConfig> for GeminiConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Google Gemini `generateContent` client
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider. A missing key is not an error here;
    /// it surfaces on the first call. An unusable endpoint or HTTP client
    /// setup is a configuration error.
    pub fn new(config: GeminiConfig) -> collecthub_core::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollectHubError::Config(format!("failed to create HTTP client: {}", e)))?;

        let provider = Self { config, client };
        let endpoint = Url::parse(&provider.endpoint()).map_err(|e| {
            CollectHubError::Config(format!(
                "invalid analysis.api_base {:?}: {}",
                provider.config.api_base, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CollectHubError::Config(format!(
                "analysis.api_base {:?} must be an http(s) URL",
                provider.config.api_base
            )));
        }
        Ok(provider)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&SecretString> {
        self.config
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Single request to the Gemini API. No retries.
    async fn try_request(&self, prompt: &str) -> LLMResult<GenerateContentResponse> {
        let api_key = self.api_key().ok_or(AnalysisError::MissingCredential)?;

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            debug!(
                "Gemini API error ({}): {}",
                status,
                String::from_utf8_lossy(&body)
            );
            return Err(AnalysisError::UpstreamStatus(status.as_u16()));
        }

        serde_json::from_slice(&body).map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        let start = Instant::now();
        let response = self.try_request(prompt).await?;
        let completion = extract_completion(response, &self.config.model)?;
        debug!(
            "Gemini completion: {} chars in {:?}",
            completion.content.len(),
            start.elapsed()
        );
        Ok(completion)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// First candidate's first part. Missing or blank text is an empty completion.
fn extract_completion(response: GenerateContentResponse, model: &str) -> LLMResult<LLMResponse> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AnalysisError::EmptyCompletion)?;
    let text = candidate
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(AnalysisError::EmptyCompletion)?;

    Ok(LLMResponse {
        content: text,
        finish_reason: candidate.finish_reason,
        model: response.model_version.unwrap_or_else(|| model.to_string()),
    })
}

// Gemini API request/response types

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        path: String,
        query: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct MockUpstream {
        status: StatusCode,
        body: String,
        delay: Duration,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    async fn respond(
        State(mock): State<MockUpstream>,
        uri: Uri,
        body: Bytes,
    ) -> (StatusCode, String) {
        mock.requests.lock().unwrap().push(RecordedRequest {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        if !mock.delay.is_zero() {
            tokio::time::sleep(mock.delay).await;
        }
        (mock.status, mock.body.clone())
    }

    async fn spawn_upstream(
        status: StatusCode,
        body: impl Into<String>,
        delay: Duration,
    ) -> (String, Arc<Mutex<Vec<RecordedRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mock = MockUpstream {
            status,
            body: body.into(),
            delay,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(respond).with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1beta", addr), requests)
    }

    fn config(api_base: &str, api_key: Option<&str>, timeout_secs: u64) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(|k| SecretString::from(k.to_string())),
            api_base: api_base.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn provider(api_base: &str, api_key: Option<&str>, timeout_secs: u64) -> GeminiProvider {
        GeminiProvider::new(config(api_base, api_key, timeout_secs)).unwrap()
    }

    fn completion_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.0-flash-001"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_successful_completion_and_request_shape() {
        let (base, requests) = spawn_upstream(
            StatusCode::OK,
            completion_body("You are curious."),
            Duration::ZERO,
        )
        .await;
        let provider = provider(&base, Some("test-key"), 5);

        let response = provider.generate("analyze me").await.unwrap();
        assert_eq!(response.content, "You are curious.");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.model, "gemini-2.0-flash-001");

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].path, "/v1beta/models/gemini-2.0-flash:generateContent");
        assert_eq!(recorded[0].query.as_deref(), Some("key=test-key"));
        assert_eq!(
            recorded[0].body,
            json!({"contents": [{"parts": [{"text": "analyze me"}]}]})
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let (base, requests) =
            spawn_upstream(StatusCode::OK, completion_body("unused"), Duration::ZERO).await;

        for key in [None, Some(""), Some("   ")] {
            let provider = provider(&base, key, 5);
            assert!(!provider.has_credential());
            let err = provider.generate("prompt").await.unwrap_err();
            assert!(matches!(err, AnalysisError::MissingCredential));
            assert!(err.is_configuration());
        }
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_upstream_status() {
        let (base, _) = spawn_upstream(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error":{"message":"overloaded"}}"#,
            Duration::ZERO,
        )
        .await;
        let err = provider(&base, Some("k"), 5).generate("p").await.unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamStatus(503)));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        let (base, _) = spawn_upstream(StatusCode::OK, "not json", Duration::ZERO).await;
        let err = provider(&base, Some("k"), 5).generate("p").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_or_parts_is_empty_completion() {
        let bodies = [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
        ];
        for body in bodies {
            let (base, _) = spawn_upstream(StatusCode::OK, body.to_string(), Duration::ZERO).await;
            let err = provider(&base, Some("k"), 5).generate("p").await.unwrap_err();
            assert!(
                matches!(err, AnalysisError::EmptyCompletion),
                "unexpected {:?} for {}",
                err,
                body
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        let err = provider("http://127.0.0.1:1/v1beta", Some("k"), 2)
            .generate("p")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let (base, _) = spawn_upstream(
            StatusCode::OK,
            completion_body("too late"),
            Duration::from_secs(3),
        )
        .await;
        let err = provider(&base, Some("k"), 1).generate("p").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
    }

    #[test]
    fn test_config_from_analysis_settings() {
        let analysis = AnalysisConfig {
            api_key: Some(SecretString::from("from-config".to_string())),
            model: "gemini-1.5-pro".to_string(),
            timeout_secs: 12,
            ..Default::default()
        };
        let config = GeminiConfig::from(&analysis);
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.api_base, GEMINI_API_BASE);
        assert_eq!(config.api_key.unwrap().expose_secret(), "from-config");
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let provider = provider("http://localhost:9/v1beta/", Some("k"), 1);
        assert_eq!(
            provider.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_unusable_endpoint_is_a_configuration_error() {
        for api_base in ["", "not a url", "localhost:9/v1beta"] {
            let err = GeminiProvider::new(config(api_base, Some("k"), 1))
                .err()
                .unwrap_or_else(|| panic!("{:?} should be rejected", api_base));
            assert!(matches!(err, CollectHubError::Config(_)), "{:?}: {}", api_base, err);
        }
        assert!(GeminiProvider::new(config("http://127.0.0.1:9/v1beta", None, 1)).is_ok());
    }
}
