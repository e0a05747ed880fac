use super::{
    judge_output, MetricsReport, ProviderKind, TranslationMetrics, TranslationProvider,
    TranslationRequest, TranslationResult,
};
use crate::config::Config;
use crate::error::TranslationError;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub source_language: Option<String>,
    pub target_language: String,
    pub context: Option<String>,
}

impl TranslateOptions {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
            ..Default::default()
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
}

/// Tries each configured provider in priority order until one produces an
/// acceptable translation. Each provider is attempted at most once per call.
pub struct TranslationManager {
    providers: Vec<Arc<dyn TranslationProvider>>,
    metrics: TranslationMetrics,
}

impl TranslationManager {
    pub fn new(mut providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        // Stable sort keeps registration order among equal priorities
        providers.sort_by_key(|p| p.priority());
        Self {
            providers,
            metrics: TranslationMetrics::new(),
        }
    }

    /// Build every provider in `ProviderKind::ALL` from configuration.
    pub fn from_config(config: &Config, client: &reqwest::Client) -> Self {
        Self::new(
            ProviderKind::ALL
                .iter()
                .map(|kind| kind.build(config, client))
                .collect(),
        )
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn configured_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.name())
            .collect()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    pub async fn translate_text(
        &self,
        text: &str,
        options: &TranslateOptions,
    ) -> TranslationResult {
        let request = TranslationRequest {
            text: text.to_string(),
            source_language: options.source_language.clone(),
            target_language: options.target_language.clone(),
            context: options.context.clone(),
        };
        self.translate(&request).await
    }

    /// Never fails: when no provider succeeds the result carries the
    /// original text with `success == false`.
    pub async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        self.metrics.record_request();

        if request.text.trim().is_empty() {
            return TranslationResult::failure(request, "nothing to translate");
        }

        let mut last_error: Option<String> = None;
        let mut attempted = 0;

        for provider in self.providers.iter().filter(|p| p.is_configured()) {
            attempted += 1;
            self.metrics.record_attempt();
            debug!(
                "Translating to {} with {} (priority {})",
                request.target_language,
                provider.name(),
                provider.priority()
            );

            let failure = match provider.translate(request).await {
                Ok(result) if !result.success => result
                    .error
                    .clone()
                    .unwrap_or_else(|| "provider reported failure".to_string()),
                Ok(result) => {
                    let verdict = judge_output(&request.text, &result.translated_text);
                    if verdict.is_acceptable(provider.distrusts_identical_output()) {
                        self.metrics.record_translated();
                        return result;
                    }
                    TranslationError::UntrustedOutput(verdict.reason()).to_string()
                }
                Err(e) => e.to_string(),
            };

            self.metrics.record_provider_failure();
            warn!(
                "Provider {} failed for {}: {}",
                provider.name(),
                request.target_language,
                failure
            );
            last_error = Some(format!("{}: {}", provider.name(), failure));
        }

        self.metrics.record_exhausted();

        let error = match last_error {
            Some(last_error) if attempted > 0 => {
                TranslationError::AllProvidersExhausted { last_error }
            }
            _ => TranslationError::NoProviderConfigured,
        };
        warn!("Translation to {} unavailable: {}", request.target_language, error);

        TranslationResult::failure(request, error.to_string())
    }
}
