use super::{
    judge_output, read_error_body, CacheKey, TranslationCache, TranslationProvider,
    TranslationRequest, TranslationResult, REQUEST_TIMEOUT,
};
use crate::error::TranslationError;
use crate::i18n::backend_code;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: &'a str,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    #[serde(default)]
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
struct GoogleTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
    #[serde(rename = "detectedSourceLanguage")]
    detected_source_language: Option<String>,
}

/// Google Cloud Translation (v2) behind a single API key.
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    priority: u8,
    timeout: Duration,
    cache: TranslationCache,
}

impl GoogleTranslateProvider {
    pub fn new(client: reqwest::Client, api_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            priority: 2,
            timeout: REQUEST_TIMEOUT,
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

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
    fn name(&self) -> &str {
        "google"
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

        let key = CacheKey::exact(&request.text, &request.target_language);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Google cache hit for {}", request.target_language);
            return Ok(TranslationResult::translated(request, cached));
        }

        let body = GoogleRequest {
            q: &request.text,
            target: backend_code(&request.target_language),
            source: request.source_language.as_deref().map(backend_code),
            format: "text",
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&body)
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

        let parsed: GoogleResponse =
            response
                .json()
                .await
                .map_err(|e| TranslationError::MalformedResponse {
                    instance: self.api_url.clone(),
                    message: e.to_string(),
                })?;

        let translation = parsed.data.translations.into_iter().next().ok_or_else(|| {
            TranslationError::MalformedResponse {
                instance: self.api_url.clone(),
                message: "response contained no translations".to_string(),
            }
        })?;

        let verdict = judge_output(&request.text, &translation.translated_text);
        if !verdict.is_acceptable(self.distrusts_identical_output()) {
            return Err(TranslationError::UntrustedOutput(verdict.reason()));
        }

        self.cache.insert(key, translation.translated_text.clone());

        Ok(TranslationResult::translated(request, translation.translated_text)
            .with_detected_source(translation.detected_source_language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn google_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "data": {
                "translations": [
                    { "translatedText": text, "detectedSourceLanguage": "pt" }
                ]
            }
        })
    }

    fn provider(server: &MockServer) -> GoogleTranslateProvider {
        GoogleTranslateProvider::new(
            reqwest::Client::new(),
            &format!("{}/language/translate/v2", server.uri()),
            Some("test-key".to_string()),
        )
    }

    #[test]
    fn test_not_configured_without_key() {
        let provider = GoogleTranslateProvider::new(
            reqwest::Client::new(),
            "https://example.invalid",
            Some("   ".to_string()),
        );
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_translate_without_key_returns_not_configured() {
        let provider =
            GoogleTranslateProvider::new(reqwest::Client::new(), "https://example.invalid", None);

        let err = provider
            .translate(&TranslationRequest::new("Olá", "es"))
            .await
            .unwrap_err();
        assert_eq!(err, TranslationError::NotConfigured("google".to_string()));
    }

    #[tokio::test]
    async fn test_translate_success_passes_key_and_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/language/translate/v2"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "q": "Serra da Bodoquena",
                "target": "fr",
                "source": "pt",
                "format": "text"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(google_body("Sierra de Bodoquena")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Serra da Bodoquena", "fr").with_source("pt-BR");
        let result = provider(&server).translate(&request).await.expect("Should translate");

        assert!(result.success);
        assert_eq!(result.translated_text, "Sierra de Bodoquena");
        assert_eq!(result.source_language, "pt");
    }

    #[tokio::test]
    async fn test_source_omitted_when_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Hello")))
            .mount(&server)
            .await;

        let provider = provider(&server);
        provider
            .translate(&TranslationRequest::new("Olá", "en-US"))
            .await
            .expect("Should translate");

        let received = server.received_requests().await.expect("recording enabled");
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).expect("json");
        assert!(body.get("source").is_none());
    }

    #[tokio::test]
    async fn test_empty_translations_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "translations": [] } })),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .translate(&TranslationRequest::new("Olá", "es"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::MalformedResponse { .. }));
        assert!(err.to_string().contains("no translations"));
    }

    #[tokio::test]
    async fn test_forbidden_key_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server)
            .translate(&TranslationRequest::new("Olá", "es"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_identical_output_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Pantanal")))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let err = provider
            .translate(&TranslationRequest::new("Pantanal", "en-US"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::UntrustedOutput(_)));
        assert!(provider.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_is_per_target_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Fazenda")))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        for target in ["es", "es", "fr"] {
            provider
                .translate(&TranslationRequest::new("Fazenda histórica", target))
                .await
                .expect("Should translate");
        }

        assert_eq!(provider.cache().len(), 2);
    }
}
