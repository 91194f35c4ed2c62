//! Provider clients for the supported model backends.
//!
//! The central piece is one generic retrying transport
//! ([`LlmClient`]) parameterized by a [`ChatBackend`] that knows how to build
//! a backend-specific request and extract the single text payload from its
//! response. Adding a backend means writing one small `ChatBackend` impl;
//! the retry/backoff/timeout behavior is shared.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};

/// Total attempts per request, including the first one.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt; doubles each subsequent attempt.
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(1000);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Supported model backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    OpenAi,
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Groq,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Anthropic,
    ];

    /// The designated fallback backend.
    pub const DEFAULT: ProviderKind = ProviderKind::Groq;

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Environment variable consulted when the config carries no key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            // Anthropic counts the full max_tokens against rate limits
            ProviderKind::Anthropic => 1024,
            _ => 8000,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(PlannerError::Config(format!("unknown provider '{other}'"))),
        }
    }
}

/// Fully resolved per-client settings. Built once at client construction and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ProviderSettings {
    /// Resolve settings for one provider. Fails fast when no credential can
    /// be found, before any network attempt.
    pub fn resolve(kind: ProviderKind, config: &PlannerConfig) -> PlannerResult<Self> {
        let api_key = config
            .resolve_api_key(kind)
            .ok_or(PlannerError::MissingApiKey(kind.as_str()))?;
        let provider_config = config.provider_config(kind);
        Ok(Self {
            kind,
            api_key,
            model: provider_config
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            max_tokens: provider_config
                .max_tokens
                .unwrap_or_else(|| kind.default_max_tokens()),
            temperature: provider_config.temperature.unwrap_or(0.7),
        })
    }
}

/// Backend-specific request builder and response extractor.
pub trait ChatBackend: Send + Sync {
    fn endpoint(&self, settings: &ProviderSettings) -> String;

    /// Auth and version headers for one request.
    fn headers(&self, settings: &ProviderSettings) -> Vec<(&'static str, String)>;

    /// JSON body carrying the model id, token/temperature limits and a
    /// single-turn conversation.
    fn request_body(
        &self,
        settings: &ProviderSettings,
        system_prompt: &str,
        user_prompt: &str,
    ) -> serde_json::Value;

    /// Pull the single text payload out of a 200 body. `None` means the
    /// response shape is not what this backend produces on success.
    fn extract_text(&self, body: &serde_json::Value) -> Option<String>;
}

/// OpenAI-compatible chat completions backend. Serves both OpenAI itself and
/// Groq, which differ only in base URL.
pub struct OpenAiChat {
    url: &'static str,
}

impl OpenAiChat {
    pub fn openai() -> Self {
        Self {
            url: "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn groq() -> Self {
        Self {
            url: "https://api.groq.com/openai/v1/chat/completions",
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

impl ChatBackend for OpenAiChat {
    fn endpoint(&self, _settings: &ProviderSettings) -> String {
        self.url.to_string()
    }

    fn headers(&self, settings: &ProviderSettings) -> Vec<(&'static str, String)> {
        vec![("Authorization", format!("Bearer {}", settings.api_key))]
    }

    fn request_body(
        &self,
        settings: &ProviderSettings,
        system_prompt: &str,
        user_prompt: &str,
    ) -> serde_json::Value {
        json!({
            "model": settings.model,
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        })
    }

    fn extract_text(&self, body: &serde_json::Value) -> Option<String> {
        let response: ChatCompletionResponse = serde_json::from_value(body.clone()).ok()?;
        Some(response.choices.into_iter().next()?.message.content)
    }
}

/// Anthropic messages backend. The system prompt rides in the top-level
/// `system` field rather than the message list.
pub struct AnthropicChat;

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

impl ChatBackend for AnthropicChat {
    fn endpoint(&self, _settings: &ProviderSettings) -> String {
        "https://api.anthropic.com/v1/messages".to_string()
    }

    fn headers(&self, settings: &ProviderSettings) -> Vec<(&'static str, String)> {
        vec![
            ("x-api-key", settings.api_key.clone()),
            ("anthropic-version", "2023-06-01".to_string()),
        ]
    }

    fn request_body(
        &self,
        settings: &ProviderSettings,
        system_prompt: &str,
        user_prompt: &str,
    ) -> serde_json::Value {
        json!({
            "model": settings.model,
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
            "system": system_prompt,
            "messages": [
                {"role": "user", "content": user_prompt},
            ],
        })
    }

    fn extract_text(&self, body: &serde_json::Value) -> Option<String> {
        let response: AnthropicResponse = serde_json::from_value(body.clone()).ok()?;
        Some(response.content.into_iter().next()?.text)
    }
}

/// Gemini generateContent backend.
pub struct GeminiChat;

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

impl ChatBackend for GeminiChat {
    fn endpoint(&self, settings: &ProviderSettings) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            settings.model
        )
    }

    fn headers(&self, settings: &ProviderSettings) -> Vec<(&'static str, String)> {
        vec![("x-goog-api-key", settings.api_key.clone())]
    }

    fn request_body(
        &self,
        settings: &ProviderSettings,
        system_prompt: &str,
        user_prompt: &str,
    ) -> serde_json::Value {
        json!({
            "system_instruction": {"parts": [{"text": system_prompt}]},
            "contents": [
                {"role": "user", "parts": [{"text": user_prompt}]},
            ],
            "generationConfig": {
                "maxOutputTokens": settings.max_tokens,
                "temperature": settings.temperature,
            },
        })
    }

    fn extract_text(&self, body: &serde_json::Value) -> Option<String> {
        let response: GeminiResponse = serde_json::from_value(body.clone()).ok()?;
        Some(
            response
                .candidates
                .into_iter()
                .next()?
                .content
                .parts
                .into_iter()
                .next()?
                .text,
        )
    }
}

/// One request/response cycle against a model backend.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send one single-turn request, retrying transient failures. The caller
    /// blocks (asynchronously) through backoff waits.
    async fn send_request(&self, system_prompt: &str, user_prompt: &str) -> PlannerResult<String>;

    fn kind(&self) -> ProviderKind;
}

/// Outcome of one attempt, classified for the retry loop.
enum AttemptError {
    /// HTTP 429, 5xx, or a transport-level failure. Eligible for retry.
    Transient(String),
    /// Everything else terminates the call immediately.
    Fatal(PlannerError),
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff schedule: 1000ms, 2000ms, 4000ms for attempts 1..=3.
fn delay_for(attempt: u32) -> Duration {
    INITIAL_RETRY_DELAY * 2u32.pow(attempt.saturating_sub(1))
}

fn truncate_for_log(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Shared retry loop. Waits between transient failures but never after the
/// final attempt; dropping the future during a wait aborts the whole call.
async fn send_with_retry<F, Fut>(provider: &'static str, mut do_attempt: F) -> PlannerResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, AttemptError>>,
{
    let mut last_message = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        match do_attempt().await {
            Ok(text) => return Ok(text),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Transient(message)) => {
                if attempt < MAX_ATTEMPTS {
                    let delay = delay_for(attempt);
                    log::warn!(
                        "{} request failed ({}), retrying in {}ms (attempt {}/{})",
                        provider,
                        message,
                        delay.as_millis(),
                        attempt,
                        MAX_ATTEMPTS
                    );
                    tokio::time::sleep(delay).await;
                }
                last_message = message;
            }
        }
    }
    log::error!(
        "{} request failed after {} attempts: {}",
        provider,
        MAX_ATTEMPTS,
        last_message
    );
    Err(PlannerError::RetriesExhausted {
        provider,
        attempts: MAX_ATTEMPTS,
        message: last_message,
    })
}

/// Generic HTTPS client for one backend. Holds no per-call mutable state and
/// is reusable across many sequential or concurrent calls.
pub struct LlmClient<B: ChatBackend> {
    backend: B,
    settings: ProviderSettings,
    http: reqwest::Client,
}

impl<B: ChatBackend> LlmClient<B> {
    pub fn new(backend: B, settings: ProviderSettings) -> PlannerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlannerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            backend,
            settings,
            http,
        })
    }

    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<String, AttemptError> {
        let provider = self.settings.kind.as_str();

        let mut request = self.http.post(url).header("Content-Type", "application/json");
        for (name, value) in self.backend.headers(&self.settings) {
            request = request.header(name, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("transport error: {e}")))?;

        let status = response.status();
        if is_transient(status) {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AttemptError::Transient(format!(
                "status {}: {}",
                status.as_u16(),
                truncate_for_log(&body_text, 200)
            )));
        }
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            log::error!("{} request failed: {}", provider, status.as_u16());
            log::error!("response body: {}", truncate_for_log(&body_text, 500));
            return Err(AttemptError::Fatal(PlannerError::RequestFailed {
                provider,
                status: status.as_u16(),
            }));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("failed to read body: {e}")))?;
        if body_text.is_empty() {
            return Err(AttemptError::Fatal(PlannerError::MalformedResponse {
                provider,
                detail: "empty response body".to_string(),
            }));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body_text).map_err(|_| {
            AttemptError::Fatal(PlannerError::MalformedResponse {
                provider,
                detail: format!("not JSON: {}", truncate_for_log(&body_text, 200)),
            })
        })?;

        match self.backend.extract_text(&parsed) {
            Some(text) => Ok(text),
            None => {
                log::error!(
                    "unexpected {} response format: {}",
                    provider,
                    truncate_for_log(&body_text, 500)
                );
                Err(AttemptError::Fatal(PlannerError::MalformedResponse {
                    provider,
                    detail: "missing expected content structure".to_string(),
                }))
            }
        }
    }
}

#[async_trait]
impl<B: ChatBackend> ProviderClient for LlmClient<B> {
    async fn send_request(&self, system_prompt: &str, user_prompt: &str) -> PlannerResult<String> {
        let url = self.backend.endpoint(&self.settings);
        let body = self
            .backend
            .request_body(&self.settings, system_prompt, user_prompt);
        send_with_retry(self.settings.kind.as_str(), || self.attempt(&url, &body)).await
    }

    fn kind(&self) -> ProviderKind {
        self.settings.kind
    }
}

/// Deterministic client for tests and offline runs. Records the prompts it
/// receives so callers can assert on exactly what was sent.
#[derive(Clone)]
pub struct StubClient {
    kind: ProviderKind,
    reply: Option<String>,
    calls: Arc<AtomicU32>,
    last_prompts: Arc<Mutex<Option<(String, String)>>>,
}

impl StubClient {
    pub fn succeeding(kind: ProviderKind, reply: &str) -> Self {
        Self {
            kind,
            reply: Some(reply.to_string()),
            calls: Arc::new(AtomicU32::new(0)),
            last_prompts: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(kind: ProviderKind) -> Self {
        Self {
            kind,
            reply: None,
            calls: Arc::new(AtomicU32::new(0)),
            last_prompts: Arc::new(Mutex::new(None)),
        }
    }

    /// Number of `send_request` calls observed so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The (system, user) prompt pair from the most recent call, if any.
    pub fn last_prompts(&self) -> Option<(String, String)> {
        match self.last_prompts.lock() {
            Ok(guard) => (*guard).clone(),
            Err(poisoned) => (*poisoned.into_inner()).clone(),
        }
    }
}

#[async_trait]
impl ProviderClient for StubClient {
    async fn send_request(&self, system_prompt: &str, user_prompt: &str) -> PlannerResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let recorded = Some((system_prompt.to_string(), user_prompt.to_string()));
        match self.last_prompts.lock() {
            Ok(mut guard) => *guard = recorded,
            Err(poisoned) => *poisoned.into_inner() = recorded,
        }
        self.reply
            .clone()
            .ok_or(PlannerError::RetriesExhausted {
                provider: self.kind.as_str(),
                attempts: MAX_ATTEMPTS,
                message: "stub failure".to_string(),
            })
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

/// Builds the client for a provider kind. The exhaustive match doubles as
/// the guarantee that every enumerated provider has a client.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(
        kind: ProviderKind,
        config: &PlannerConfig,
    ) -> PlannerResult<Box<dyn ProviderClient>> {
        let settings = ProviderSettings::resolve(kind, config)?;
        let client: Box<dyn ProviderClient> = match kind {
            ProviderKind::Groq => Box::new(LlmClient::new(OpenAiChat::groq(), settings)?),
            ProviderKind::OpenAi => Box::new(LlmClient::new(OpenAiChat::openai(), settings)?),
            ProviderKind::Gemini => Box::new(LlmClient::new(GeminiChat, settings)?),
            ProviderKind::Anthropic => Box::new(LlmClient::new(AnthropicChat, settings)?),
        };
        Ok(client)
    }
}
