//! Text translation through a priority-ordered chain of providers.
//!
//! - `manager`: Fallback orchestration across providers
//! - `libretranslate`: Free multi-instance backend guarded by a per-instance circuit breaker
//! - `google`: Single keyed backend
//! - `generative`: Prompted chat-completion backend
//! - `registry`: Compile-time list of provider implementations
//! - `policy`: Output acceptance rules shared by providers and the manager
//! - `cache`, `circuit`, `metrics`: Per-service state owned by the objects above

mod cache;
mod circuit;
mod generative;
mod google;
mod libretranslate;
mod manager;
mod metrics;
mod policy;
mod registry;

pub use cache::{CacheKey, TranslationCache, DEFAULT_CACHE_CAPACITY};
pub use circuit::{CircuitBreaker, CIRCUIT_COOLDOWN};
pub use generative::{GenerativeProvider, GENERATIVE_CACHE_PREFIX_CHARS};
pub use google::GoogleTranslateProvider;
pub use libretranslate::LibreTranslateProvider;
pub use manager::{TranslateOptions, TranslationManager};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use policy::{judge_output, OutputVerdict};
pub use registry::ProviderKind;

use crate::error::TranslationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bound on a single network attempt against any backend.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    pub target_language: String,
    /// Free-form domain hint, only read by prompt-based providers
    #[serde(default)]
    pub context: Option<String>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: None,
            target_language: target_language.into(),
            context: None,
        }
    }

    pub fn with_source(mut self, source_language: impl Into<String>) -> Self {
        self.source_language = Some(source_language.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Source language as sent to backends, `auto` when unknown.
    pub(crate) fn source_or_auto(&self) -> String {
        self.source_language
            .as_deref()
            .map(crate::i18n::backend_code)
            .unwrap_or_else(|| "auto".to_string())
    }
}

/// Outcome of a translation. A failed result still carries usable text:
/// the original input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TranslationResult {
    pub fn translated(request: &TranslationRequest, translated_text: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            source_language: request
                .source_language
                .clone()
                .unwrap_or_else(|| "auto".to_string()),
            target_language: request.target_language.clone(),
            success: true,
            error: None,
            confidence: None,
        }
    }

    pub fn failure(request: &TranslationRequest, error: impl Into<String>) -> Self {
        Self {
            translated_text: request.text.clone(),
            source_language: request
                .source_language
                .clone()
                .unwrap_or_else(|| "auto".to_string()),
            target_language: request.target_language.clone(),
            success: false,
            error: Some(error.into()),
            confidence: None,
        }
    }

    pub fn with_detected_source(mut self, source_language: Option<String>) -> Self {
        if let Some(source) = source_language.filter(|s| !s.is_empty()) {
            self.source_language = source;
        }
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f32>) -> Self {
        self.confidence = confidence;
        self
    }
}

/// A backend able to translate one string.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Lower values are tried first.
    fn priority(&self) -> u8;

    fn is_configured(&self) -> bool;

    /// Whether output identical to the input counts as a failed attempt.
    fn distrusts_identical_output(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslationError>;
}

/// Read an error body for diagnostics without failing the caller.
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_without_optional_fields() {
        let request: TranslationRequest =
            serde_json::from_str(r#"{"text":"Bonito","target_language":"en-US"}"#)
                .expect("deserialize");

        assert_eq!(request.text, "Bonito");
        assert!(request.source_language.is_none());
        assert!(request.context.is_none());
    }

    #[test]
    fn test_source_or_auto() {
        let request = TranslationRequest::new("Olá", "en-US");
        assert_eq!(request.source_or_auto(), "auto");
        assert_eq!(request.with_source("pt-BR").source_or_auto(), "pt");
    }

    #[test]
    fn test_failure_keeps_original_text() {
        let request = TranslationRequest::new("Gruta do Lago Azul", "en-US").with_source("pt-BR");
        let result = TranslationResult::failure(&request, "boom");

        assert!(!result.success);
        assert_eq!(result.translated_text, "Gruta do Lago Azul");
        assert_eq!(result.source_language, "pt-BR");
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_result_serialization_omits_empty_optionals() {
        let request = TranslationRequest::new("Rio", "es");
        let json = serde_json::to_string(&TranslationResult::translated(&request, "Río"))
            .expect("serialize");

        assert!(json.contains("\"translated_text\":\"Río\""));
        assert!(!json.contains("error"));
        assert!(!json.contains("confidence"));
    }

    #[test]
    fn test_detected_source_ignores_empty() {
        let request = TranslationRequest::new("Rio", "es");
        let result = TranslationResult::translated(&request, "Río")
            .with_detected_source(Some(String::new()));
        assert_eq!(result.source_language, "auto");

        let result = result.with_detected_source(Some("pt".to_string()));
        assert_eq!(result.source_language, "pt");
    }
}
