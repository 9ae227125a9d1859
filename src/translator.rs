use crate::batch::{partition, DEFAULT_BATCH_SIZE};
use crate::codec::{self, PromptContext};
use crate::config::Config;
use crate::error::Error;
use crate::rate::RateGovernor;
use crate::request::{TranslationRequest, TranslationResult};
use crate::usage::UsageCounter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const TRANSLATION_API: &str = "translation";

/// Fixed pause between consecutive batches, independent of the governor's
/// own pacing heuristic.
const INTER_BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Chat Completion request for a translation batch
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Token accounting block of a model response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Outcome of one upstream batch call.
///
/// Degradation is a value, not an intercepted exception: a failed batch
/// still yields one result per request (the echo fallback) plus the cause,
/// and the orchestrator merges it without aborting the remaining batches.
#[derive(Debug)]
pub enum BatchOutcome {
    Ok(Vec<TranslationResult>),
    Degraded(Vec<TranslationResult>, Error),
}

impl BatchOutcome {
    pub fn results(&self) -> &[TranslationResult] {
        match self {
            BatchOutcome::Ok(results) => results,
            BatchOutcome::Degraded(results, _) => results,
        }
    }
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Drives end-to-end batch translation against the model endpoint.
///
/// Batches run strictly sequentially. Every request yields exactly one
/// result in input order; the only error this returns is the fail-fast
/// missing-credential check — everything downstream degrades to source-text
/// echo instead of failing the job.
pub struct Translator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    governor: RateGovernor,
    usage: UsageCounter,
    on_progress: Option<Box<ProgressFn>>,
}

impl Translator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.translation_api_url.clone(),
            api_key: config.translation_api_key.clone(),
            model: config.translation_model.clone(),
            max_tokens: config.translation_max_tokens,
            governor: RateGovernor::new(),
            usage: UsageCounter::new(),
            on_progress: None,
        }
    }

    /// Install a progress observer called with `(completed, total)` after
    /// each successfully translated batch.
    pub fn with_progress(mut self, observer: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(observer));
        self
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    /// Explicit user action; the counters are monotonic otherwise.
    pub fn reset_usage(&mut self) {
        self.usage.reset();
    }

    /// Translate a request list into `target_language`.
    ///
    /// Output always has the same length and order as the input. A batch
    /// whose upstream call fails is substituted with echo fallbacks and the
    /// remaining batches still run; the one hard error is a missing
    /// credential, checked before any network activity.
    pub async fn translate_batch(
        &mut self,
        requests: Vec<TranslationRequest>,
        target_language: &str,
        context: PromptContext,
    ) -> Result<Vec<TranslationResult>, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration(
                "translation API key is not configured",
            ));
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let batches = partition(requests, DEFAULT_BATCH_SIZE);
        let batch_count = batches.len();
        let mut results = Vec::new();

        for (index, batch) in batches.into_iter().enumerate() {
            match self.run_batch(batch, target_language, context).await {
                BatchOutcome::Ok(batch_results) => {
                    info!("Translated batch {}/{}", index + 1, batch_count);
                    if let Some(on_progress) = &self.on_progress {
                        on_progress(index + 1, batch_count);
                    }
                    results.extend(batch_results);
                }
                BatchOutcome::Degraded(batch_results, cause) => {
                    warn!(
                        "Batch {}/{} fell back to source text: {}",
                        index + 1,
                        batch_count,
                        cause
                    );
                    results.extend(batch_results);
                }
            }

            if index + 1 < batch_count {
                sleep(INTER_BATCH_DELAY).await;
            }
        }

        Ok(results)
    }

    /// One batch against the upstream. Never propagates: any failure turns
    /// into `Degraded` with one echo result per request.
    async fn run_batch(
        &mut self,
        batch: Vec<TranslationRequest>,
        target_language: &str,
        context: PromptContext,
    ) -> BatchOutcome {
        match self.request_translation(&batch, target_language, context).await {
            Ok((content, usage)) => {
                let results = codec::decode(&content, batch);
                self.usage
                    .record(usage.map(|u| u.total_tokens).unwrap_or(0));
                BatchOutcome::Ok(results)
            }
            Err(cause) => {
                let results = batch.into_iter().map(TranslationResult::fallback).collect();
                BatchOutcome::Degraded(results, cause)
            }
        }
    }

    async fn request_translation(
        &mut self,
        batch: &[TranslationRequest],
        target_language: &str,
        context: PromptContext,
    ) -> Result<(String, Option<TokenUsage>), Error> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: context.system_instruction().to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: codec::encode(batch, target_language),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.3,
        };

        self.governor.before_call().await;

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::UpstreamTransport {
                api: TRANSLATION_API,
                source: e,
            })?;

        let remaining = response
            .headers()
            .get("x-ratelimit-remaining-requests")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        self.governor.after_call(remaining);

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamStatus {
                api: TRANSLATION_API,
                status,
                message: extract_error_message(&body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| Error::UpstreamTransport {
                api: TRANSLATION_API,
                source: e,
            })?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| Error::UpstreamPayload {
                api: TRANSLATION_API,
                message: "response contained no choices".to_string(),
            })?;

        Ok((content, chat_response.usage))
    }
}

/// Pull the human-readable message out of an error payload, falling back to
/// the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ContentField;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ==================== Helper Functions ====================

    fn create_test_config(api_url: &str) -> Config {
        Config {
            store_base_url: "https://shop.example.com/admin/api".to_string(),
            store_access_token: "store-token".to_string(),
            store_page_size: 50,
            translation_api_key: "test-model-key".to_string(),
            translation_api_url: api_url.to_string(),
            translation_model: "gpt-4o-mini".to_string(),
            translation_max_tokens: 2000,
            target_language: "es".to_string(),
        }
    }

    fn make_requests(texts: &[&str]) -> Vec<TranslationRequest> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| TranslationRequest {
                source_id: "7".to_string(),
                field: ContentField::Title,
                original_text: text.to_string(),
                has_markup: false,
                original_markup: None,
                ordinal: i,
            })
            .collect()
    }

    fn create_model_response(content: &str, total_tokens: u64) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": content
                    },
                    "finish_reason": "stop"
                }
            ],
            "usage": {
                "prompt_tokens": total_tokens / 2,
                "completion_tokens": total_tokens - total_tokens / 2,
                "total_tokens": total_tokens
            }
        })
    }

    // ==================== Fail-Fast Tests ====================

    #[tokio::test]
    async fn test_translate_batch_fails_fast_without_credential() {
        let mut config = create_test_config("http://invalid-url-should-not-be-called.test");
        config.translation_api_key = "".to_string();
        let mut translator = Translator::new(&config);

        let result = translator
            .translate_batch(make_requests(&["Hello"]), "es", PromptContext::General)
            .await;

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_translate_batch_empty_input_is_empty_output() {
        let config = create_test_config("http://invalid-url-should-not-be-called.test");
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(Vec::new(), "es", PromptContext::General)
            .await
            .expect("Should succeed");

        assert!(results.is_empty());
    }

    // ==================== Success Path Tests ====================

    #[tokio::test]
    async fn test_translate_batch_single_batch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-model-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_model_response("Camisa Azul|||Algodón suave", 150)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = create_test_config(&format!("{}/v1/chat/completions", mock_server.uri()));
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(
                make_requests(&["Blue Shirt", "Soft cotton"]),
                "es",
                PromptContext::Product,
            )
            .await
            .expect("Should succeed");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].translated_text, "Camisa Azul");
        assert_eq!(results[1].translated_text, "Algodón suave");
    }

    #[tokio::test]
    async fn test_translate_batch_accumulates_usage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_model_response("Hola", 150)),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        translator
            .translate_batch(make_requests(&["Hello"]), "es", PromptContext::General)
            .await
            .expect("Should succeed");
        translator
            .translate_batch(make_requests(&["World"]), "es", PromptContext::General)
            .await
            .expect("Should succeed");

        assert_eq!(translator.usage().total_tokens(), 300);
        assert_eq!(translator.usage().request_count(), 2);

        translator.reset_usage();
        assert_eq!(translator.usage().total_tokens(), 0);
    }

    #[tokio::test]
    async fn test_translate_batch_missing_usage_block_still_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Hola"}}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(make_requests(&["Hello"]), "es", PromptContext::General)
            .await
            .expect("Should succeed");

        assert_eq!(results[0].translated_text, "Hola");
        assert_eq!(translator.usage().total_tokens(), 0);
        assert_eq!(translator.usage().request_count(), 1);
    }

    // ==================== Degradation Tests ====================

    #[tokio::test]
    async fn test_translate_batch_api_error_degrades_to_echo() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string(r#"{"error": {"message": "Internal Server Error"}}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(
                make_requests(&["Blue Shirt", "Soft cotton"]),
                "es",
                PromptContext::Product,
            )
            .await
            .expect("Degradation must not surface as an error");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].translated_text, "Blue Shirt");
        assert_eq!(results[1].translated_text, "Soft cotton");
        // No retry: the mock expects exactly one call.
    }

    #[tokio::test]
    async fn test_translate_batch_empty_choices_degrades_to_echo() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(make_requests(&["Hello"]), "es", PromptContext::General)
            .await
            .expect("Should degrade, not fail");

        assert_eq!(results[0].translated_text, "Hello");
    }

    #[tokio::test]
    async fn test_translate_batch_short_response_falls_back_on_tail() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_model_response("Uno|||Dos", 80)),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(
                make_requests(&["One", "Two", "Three"]),
                "es",
                PromptContext::General,
            )
            .await
            .expect("Should succeed");

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].translated_text, "Uno");
        assert_eq!(results[1].translated_text, "Dos");
        assert_eq!(results[2].translated_text, "Three");
    }

    // ==================== Progress Tests ====================

    #[tokio::test]
    async fn test_progress_fires_per_successful_batch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_model_response("Hola", 10)),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let mut translator = Translator::new(&config).with_progress(move |done, total| {
            assert!(done <= total);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        translator
            .translate_batch(make_requests(&["Hello"]), "es", PromptContext::General)
            .await
            .expect("Should succeed");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ==================== Request Structure Tests ====================

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: "Translate.".to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: "1. Hello".to_string(),
                },
            ],
            max_tokens: 2000,
            temperature: 0.3,
        };

        let json = serde_json::to_string(&request).expect("Should serialize");
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("max_tokens"));
        assert!(json.contains("2000"));
        assert!(json.contains("0.3"));
        assert!(json.contains("system"));
        assert!(json.contains("user"));
    }

    #[test]
    fn test_chat_response_deserialization_with_usage() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Hola|||Mundo"}}
            ],
            "usage": {"prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30}
        }"#;

        let response: ChatResponse = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(response.choices[0].message.content, "Hola|||Mundo");
        assert_eq!(response.usage.expect("usage").total_tokens, 30);
    }

    #[test]
    fn test_extract_error_message_structured() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
        assert_eq!(extract_error_message(body), "Invalid API key");
    }

    #[test]
    fn test_extract_error_message_unstructured_falls_back_to_body() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }

    // ==================== System Instruction Routing Tests ====================

    #[tokio::test]
    async fn test_request_carries_context_instruction_and_prompt() {
        let mock_server = MockServer::start().await;

        // Matching on fragments of the serialized request pins both the
        // system instruction and the numbered user prompt.
        Mock::given(method("POST"))
            .and(body_string_contains("marketing"))
            .and(body_string_contains("1. Blue Shirt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_model_response("Camisa Azul", 10)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let mut translator = Translator::new(&config);

        let results = translator
            .translate_batch(
                make_requests(&["Blue Shirt"]),
                "es",
                PromptContext::Product,
            )
            .await
            .expect("Should succeed");

        assert_eq!(results[0].translated_text, "Camisa Azul");
    }
}
