//! 텍스트 요약기.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use praice_core::InferenceConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{check_status, http_client, InferenceError, InferenceResult};

/// 자체 추론 API에서 사용하는 요약 모델.
pub const BART_MODEL: &str = "facebook/bart-large-cnn";

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes text.";

/// 외부 LLM에 보내는 요약 프롬프트.
pub fn summary_prompt(text: &str, max_tokens: u32) -> String {
    format!(
        "Please summarize the following text in about {} tokens and in one paragraph:\n\n{}",
        max_tokens, text
    )
}

/// 텍스트 요약기.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// 레지스트리 키
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str, max_tokens: u32) -> InferenceResult<String>;
}

// =============================================================================
// 자체 추론 API (BART)
// =============================================================================

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
    max_tokens: u32,
    model_name: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// `POST {text, max_tokens, model_name}` → `{summary}`
pub struct InferenceApiSummarizer {
    client: Client,
    url: String,
    model_name: String,
}

impl InferenceApiSummarizer {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            model_name: BART_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

#[async_trait]
impl Summarizer for InferenceApiSummarizer {
    fn name(&self) -> &str {
        "bart"
    }

    async fn summarize(&self, text: &str, max_tokens: u32) -> InferenceResult<String> {
        let request = SummarizeRequest {
            text,
            max_tokens,
            model_name: &self.model_name,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let body: SummarizeResponse = check_status(response).await?.json().await?;
        Ok(body.summary.trim().to_string())
    }
}

// =============================================================================
// OpenAI
// =============================================================================

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI chat completions 요약기
pub struct OpenAiSummarizer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(client: Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, text: &str, max_tokens: u32) -> InferenceResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::MissingApiKey("openai".to_string()))?;

        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": summary_prompt(text, max_tokens)},
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = check_status(response).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| InferenceError::InvalidResponse("no completion choices".to_string()))
    }
}

// =============================================================================
// Anthropic
// =============================================================================

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages API 요약기
pub struct AnthropicSummarizer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl AnthropicSummarizer {
    pub fn new(client: Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn summarize(&self, text: &str, max_tokens: u32) -> InferenceResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::MissingApiKey("anthropic".to_string()))?;

        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "user", "content": summary_prompt(text, max_tokens)},
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let message: MessagesResponse = check_status(response).await?.json().await?;

        let text: String = message
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(InferenceError::InvalidResponse(
                "no text content in response".to_string(),
            ));
        }
        Ok(text.trim().to_string())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// 모델 이름 → 요약기.
#[derive(Clone)]
pub struct SummarizerRegistry {
    summarizers: BTreeMap<String, Arc<dyn Summarizer>>,
    default_model: String,
}

impl SummarizerRegistry {
    /// 빈 레지스트리
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            summarizers: BTreeMap::new(),
            default_model: default_model.into(),
        }
    }

    /// 설정으로 bart/openai/anthropic 요약기를 등록합니다.
    ///
    /// API 키가 없는 요약기도 등록되며, 호출 시 `MissingApiKey`로 실패합니다.
    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        let client = http_client(config.timeout_secs)?;
        let mut registry = Self::new(&config.summarization_model);

        registry.register(Arc::new(InferenceApiSummarizer::new(
            client.clone(),
            &config.summarizer_url,
        )));
        registry.register(Arc::new(OpenAiSummarizer::new(
            client.clone(),
            config.openai_api_key.clone(),
            &config.openai_model,
        )));
        registry.register(Arc::new(AnthropicSummarizer::new(
            client,
            config.anthropic_api_key.clone(),
            &config.anthropic_model,
        )));

        debug!(models = ?registry.models(), default = %registry.default_model, "요약기 등록");
        Ok(registry)
    }

    /// 요약기를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register(&mut self, summarizer: Arc<dyn Summarizer>) {
        self.summarizers
            .insert(summarizer.name().to_string(), summarizer);
    }

    pub fn get(&self, name: &str) -> InferenceResult<Arc<dyn Summarizer>> {
        self.summarizers
            .get(name)
            .cloned()
            .ok_or_else(|| InferenceError::UnknownModel(name.to_string()))
    }

    /// 설정된 기본 모델의 요약기.
    pub fn default_summarizer(&self) -> InferenceResult<Arc<dyn Summarizer>> {
        self.get(&self.default_model)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn models(&self) -> Vec<&str> {
        self.summarizers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_summary_prompt() {
        assert_eq!(
            summary_prompt("Body", 200),
            "Please summarize the following text in about 200 tokens and in one paragraph:\n\nBody"
        );
    }

    #[test]
    fn test_registry_from_config() {
        let registry = SummarizerRegistry::from_config(&InferenceConfig::default()).unwrap();
        assert_eq!(registry.models(), vec!["anthropic", "bart", "openai"]);
        assert_eq!(registry.default_summarizer().unwrap().name(), "bart");
        assert!(matches!(
            registry.get("t5").err(),
            Some(InferenceError::UnknownModel(_))
        ));
    }

    #[tokio::test]
    async fn test_inference_api_summarizer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .match_body(Matcher::PartialJson(json!({
                "text": "Long article",
                "max_tokens": 200,
                "model_name": BART_MODEL,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary": " Short summary. "}"#)
            .create_async()
            .await;

        let summarizer =
            InferenceApiSummarizer::new(Client::new(), format!("{}/summarize", server.url()));
        let summary = summarizer.summarize("Long article", 200).await.unwrap();

        assert_eq!(summary, "Short summary.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_inference_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/summarize")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let summarizer =
            InferenceApiSummarizer::new(Client::new(), format!("{}/summarize", server.url()));
        let err = summarizer.summarize("text", 50).await.unwrap_err();
        assert!(matches!(err, InferenceError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_openai_summarizer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Summary."}}]}"#)
            .create_async()
            .await;

        let summarizer =
            OpenAiSummarizer::new(Client::new(), Some("sk-test".to_string()), "gpt-4o-mini")
                .with_base_url(server.url());
        assert_eq!(summarizer.summarize("text", 100).await.unwrap(), "Summary.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_anthropic_summarizer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "ak-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "text", "text": "Claude summary."}]}"#)
            .create_async()
            .await;

        let summarizer = AnthropicSummarizer::new(
            Client::new(),
            Some("ak-test".to_string()),
            "claude-3-5-sonnet-20240620",
        )
        .with_base_url(server.url());
        assert_eq!(
            summarizer.summarize("text", 100).await.unwrap(),
            "Claude summary."
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let summarizer = OpenAiSummarizer::new(Client::new(), None, "gpt-4o-mini");
        let err = summarizer.summarize("text", 100).await.unwrap_err();
        assert!(matches!(err, InferenceError::MissingApiKey(_)));
    }
}
