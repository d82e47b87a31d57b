//! Gemini `generateContent` backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{AiError, GenerationRequest, ResponseFormat, TextGenerator};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();

        info!(url = %base_url, model = %model, has_key = api_key.is_some(), "Initializing Gemini client");
        if api_key.is_none() {
            warn!("No API key configured, AI requests will fail");
        }

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let (response_mime_type, response_schema) = match request.response {
            ResponseFormat::Text => (None, None),
            ResponseFormat::StringArray => (
                Some("application/json"),
                Some(serde_json::json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                })),
            ),
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_k: request.top_k,
                top_p: request.top_p,
                response_mime_type,
                response_schema,
            },
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        let start = Instant::now();

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, request.model
            ))
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::from_request(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Gemini request rejected");
            return Err(AiError::Status { status, body });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

        let text = parsed.text().ok_or(AiError::EmptyResponse)?;
        debug!(
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiTask;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            server.uri(),
            "test-model",
            key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
    }

    #[tokio::test]
    async fn sends_prompt_and_generation_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Context: T\n\nTask Payload:\nhello\n\nPlease provide a concise summary (max 2-3 sentences) of the following note:" }] }],
                "generationConfig": { "temperature": 0.7, "topK": 40, "topP": 0.95 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("A summary.")))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server, Some("secret"));
        let request = GenerationRequest::for_task(AiTask::Summarize, "test-model", "hello", Some("T"));
        assert_eq!(gemini.generate(&request).await.unwrap(), "A summary.");
    }

    #[tokio::test]
    async fn tag_requests_declare_a_string_array_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"["a","b"]"#)))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server, Some("k"));
        let request = GenerationRequest::for_task(AiTask::GenerateTags, "test-model", "x", None);
        assert_eq!(gemini.generate(&request).await.unwrap(), r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let gemini = client(&server, Some("k"));
        let request = GenerationRequest::for_task(AiTask::FixGrammar, "test-model", "x", None);
        match gemini.generate(&request).await {
            Err(AiError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_candidates_is_an_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let gemini = client(&server, Some("k"));
        let request = GenerationRequest::for_task(AiTask::Continue, "test-model", "", None);
        assert!(matches!(
            gemini.generate(&request).await,
            Err(AiError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("never")))
            .expect(0)
            .mount(&server)
            .await;

        let gemini = client(&server, None);
        let request = GenerationRequest::for_task(AiTask::Continue, "test-model", "", None);
        assert!(matches!(
            gemini.generate(&request).await,
            Err(AiError::MissingApiKey)
        ));
    }
}
