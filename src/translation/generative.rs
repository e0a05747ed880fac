use super::{
    judge_output, read_error_body, CacheKey, TranslationCache, TranslationProvider,
    TranslationRequest, TranslationResult, REQUEST_TIMEOUT,
};
use crate::error::TranslationError;
use crate::i18n::display_name;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Length of the source-text prefix that keys the generative cache.
pub const GENERATIVE_CACHE_PREFIX_CHARS: usize = 100;

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

fn build_system_prompt(target_language: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a professional translator for a tourism platform. \
         Translate the user's text into {}.\n\n\
         Rules:\n\
         - Keep proper names of places, parks and businesses unchanged unless they have an established translation\n\
         - Preserve numbers, dates, URLs and line breaks\n\
         - Return ONLY the translated text, with no explanations, notes or surrounding quotes",
        target_language
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("\n\nContext: {}", context.trim()));
    }

    prompt
}

fn build_user_prompt(text: &str) -> String {
    format!("Text to translate:\n{}", text)
}

const QUOTE_PAIRS: [(char, char); 6] = [
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('“', '”'),
    ('‘', '’'),
    ('«', '»'),
];

/// Remove a quote pair the model sometimes wraps its whole answer in.
///
/// Only a matching open/close pair around the entire text is removed, and
/// only when the inner text does not use that quote itself.
fn strip_wrapping_quotes(raw: &str) -> String {
    let mut text = raw.trim();

    loop {
        let mut chars = text.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            break;
        };
        let Some(&(open, close)) = QUOTE_PAIRS
            .iter()
            .find(|(open, close)| *open == first && *close == last)
        else {
            break;
        };

        let inner = chars.as_str();
        if inner.contains(open) || inner.contains(close) {
            break;
        }
        text = inner.trim();
    }

    text.to_string()
}

/// Translation by prompting a chat-completion model.
pub struct GenerativeProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    priority: u8,
    timeout: Duration,
    retry: RetryConfig,
    cache: TranslationCache,
}

impl GenerativeProvider {
    pub fn new(
        client: reqwest::Client,
        api_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            priority: 3,
            timeout: REQUEST_TIMEOUT,
            retry: RetryConfig::once(),
            cache: TranslationCache::default(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opt into repeating failed calls. Timeouts and rate limits are never
    /// repeated; the manager falls through to the next provider instead.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    fn build_request(&self, request: &TranslationRequest) -> ChatRequest {
        let target = display_name(&request.target_language);
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(&target, request.context.as_deref()),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(&request.text),
                },
            ],
            max_completion_tokens: if is_reasoning { 8000 } else { 2000 },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    async fn complete(
        &self,
        api_key: &str,
        chat: &ChatRequest,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .timeout(self.timeout)
            .json(chat)
            .send()
            .await
            .map_err(|e| TranslationError::from_transport(&self.api_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(TranslationError::from_status(
                &self.api_url,
                status.as_u16(),
                body,
            ));
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| TranslationError::MalformedResponse {
                    instance: self.api_url.clone(),
                    message: e.to_string(),
                })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::MalformedResponse {
                instance: self.api_url.clone(),
                message: "completion contained no choices".to_string(),
            })
    }
}

#[async_trait]
impl TranslationProvider for GenerativeProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TranslationError::NotConfigured(self.name().to_string()))?;

        let key = CacheKey::prefix(
            &request.text,
            &request.target_language,
            GENERATIVE_CACHE_PREFIX_CHARS,
        );
        if let Some(cached) = self.cache.get(&key) {
            debug!("Generative cache hit for {}", request.target_language);
            return Ok(TranslationResult::translated(request, cached));
        }

        let chat = self.build_request(request);
        let raw = with_retry_if(
            &self.retry,
            &format!("Generative translation to {}", request.target_language),
            || self.complete(api_key, &chat),
            TranslationError::is_retryable,
        )
        .await?;

        let translated = strip_wrapping_quotes(&raw);
        let verdict = judge_output(&request.text, &translated);
        if !verdict.is_acceptable(self.distrusts_identical_output()) {
            return Err(TranslationError::UntrustedOutput(verdict.reason()));
        }

        self.cache.insert(key, translated.clone());

        Ok(TranslationResult::translated(request, translated))
    }
}
