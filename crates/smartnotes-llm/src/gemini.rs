//! Google Gemini LLM provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use smartnotes_core::error::{ErrorCode, NotesError, NotesResult};
use smartnotes_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
use smartnotes_core::types::{Message, MessageRole};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini LLM provider.
pub struct GeminiLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

impl GeminiLlm {
    /// Create a new Gemini LLM provider.
    ///
    /// The key comes from the config or `GEMINI_API_KEY`.
    pub fn new(config: LlmConfig) -> NotesResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                NotesError::Configuration("Gemini API key not found. Set GEMINI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            api_key
                .parse()
                .map_err(|_| NotesError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "content-type",
            "application/json"
                .parse()
                .map_err(|_| NotesError::Configuration("Invalid content type".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotesError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GEMINI_API_URL.to_string());
        Url::parse(&base_url).map_err(|e| {
            NotesError::Configuration(format!("Invalid Gemini base URL '{}': {}", base_url, e))
        })?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = LlmConfig::default().model;
        }

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }

    fn build_request(&self, messages: &[Message], options: GenerationOptions) -> GeminiRequest {
        let system_text = messages
            .iter()
            .filter(|m| matches!(m.role, MessageRole::System))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents = messages
            .iter()
            .filter(|m| !matches!(m.role, MessageRole::System))
            .map(|m| GeminiContent {
                role: Some(
                    match m.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: (!system_text.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(system_text),
                }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature.unwrap_or(self.config.temperature),
                top_k: options.top_k.unwrap_or(self.config.top_k),
                top_p: options.top_p.unwrap_or(self.config.top_p),
                max_output_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
                response_mime_type: match options.response_format {
                    Some(ResponseFormat::Json) => Some("application/json"),
                    _ => None,
                },
            },
        }
    }

    fn parse_response(body: &str) -> NotesResult<LlmResponse> {
        let response: GeminiResponse = serde_json::from_str(body).map_err(|e| NotesError::Llm {
            message: format!("Failed to parse response: {}", e),
            code: ErrorCode::LlmInvalidResponse,
            source: None,
        })?;

        if response.candidates.is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(NotesError::llm(format!("Gemini returned no content: {}", reason)));
        }

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty());

        let usage = response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(LlmResponse { content, usage })
    }
}

#[async_trait]
impl Llm for GeminiLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> NotesResult<LlmResponse> {
        let request = self.build_request(messages, options.unwrap_or_default());
        debug!(model = %self.config.model, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| NotesError::llm_connection("Gemini API request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotesError::llm_connection("Failed to read response body", e))?;

        if !status.is_success() {
            let error: Result<GeminiError, _> = serde_json::from_str(&body);
            let message = error
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.clone());
            return Err(NotesError::llm(format!(
                "Gemini API error ({}): {}",
                status, message
            )));
        }

        Self::parse_response(&body)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn config(base_url: Option<String>) -> LlmConfig {
        LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_key_fails_at_construction() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        // A blank configured key falls back to the environment.
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert!(matches!(
                GeminiLlm::new(config),
                Err(NotesError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(GeminiLlm::new(config(Some("not a url".to_string()))).is_err());
    }

    #[test]
    fn test_build_request() {
        let llm = GeminiLlm::new(config(None)).unwrap();
        let messages = vec![
            Message::system("Reply with JSON."),
            Message::user("Make cards"),
        ];
        let options = GenerationOptions {
            response_format: Some(ResponseFormat::Json),
            max_tokens: Some(256),
            ..Default::default()
        };

        let body = serde_json::to_value(llm.build_request(&messages, options)).unwrap();
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Make cards");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Reply with JSON.");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(llm.endpoint().ends_with("/models/gemini-1.5-flash:generateContent"));
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "[{\"q\":"}, {"text": "1}]"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8, "totalTokenCount": 20}
        });
        let response = GeminiLlm::parse_response(&body.to_string()).unwrap();
        assert_eq!(response.content_or_empty(), "[{\"q\":1}]");
        assert_eq!(response.usage.unwrap().total_tokens, 20);
    }

    #[test]
    fn test_parse_blocked_response() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiLlm::parse_response(&body.to_string()).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_generate_against_local_server() {
        let router = Router::new().route(
            "/models/:call",
            post(|Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(call, "gemini-1.5-flash:generateContent");
                assert_eq!(headers["x-goog-api-key"], "test-key");
                let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
                assert!((temperature - 0.7).abs() < 1e-6);
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
                }))
            }),
        );
        let llm = GeminiLlm::new(config(Some(spawn(router).await))).unwrap();

        let response = llm
            .generate(&[Message::user("hi")], None)
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_api_error_carries_provider_message() {
        let router = Router::new().route(
            "/models/:call",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"code": 400, "message": "API key not valid"}})),
                )
            }),
        );
        let llm = GeminiLlm::new(config(Some(spawn(router).await))).unwrap();

        let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();
        assert!(matches!(err, NotesError::Llm { .. }));
        assert!(err.to_string().contains("API key not valid"));
    }
}
