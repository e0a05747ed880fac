use super::{
    judge_output, read_error_body, CacheKey, CircuitBreaker, TranslationCache,
    TranslationProvider, TranslationRequest, TranslationResult, REQUEST_TIMEOUT,
};
use crate::error::TranslationError;
use crate::i18n::backend_code;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: String,
    target: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
    #[serde(rename = "detectedLanguage")]
    detected_language: Option<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    language: String,
    /// Percentage, 0-100
    confidence: Option<f32>,
}

/// LibreTranslate spread across several instances of the same free service.
///
/// Instances are tried in order, skipping any whose circuit is open. A
/// timeout, connection failure, 429 or 503 opens that instance's circuit
/// for the cooldown window; other failures just move on to the next one.
pub struct LibreTranslateProvider {
    client: reqwest::Client,
    instances: Vec<String>,
    api_key: Option<String>,
    enabled: bool,
    priority: u8,
    timeout: Duration,
    circuit: CircuitBreaker,
    cache: TranslationCache,
}

impl LibreTranslateProvider {
    /// Build the instance list: `primary` first, then `fallbacks`, with
    /// duplicates removed.
    pub fn new(client: reqwest::Client, primary: Option<&str>, fallbacks: &[String]) -> Self {
        let mut instances: Vec<String> = Vec::new();
        for instance in primary.into_iter().chain(fallbacks.iter().map(String::as_str)) {
            let instance = instance.trim().trim_end_matches('/');
            if !instance.is_empty() && !instances.iter().any(|known| known == instance) {
                instances.push(instance.to_string());
            }
        }

        Self {
            client,
            instances,
            api_key: None,
            enabled: true,
            priority: 1,
            timeout: REQUEST_TIMEOUT,
            circuit: CircuitBreaker::default(),
            cache: TranslationCache::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit: CircuitBreaker) -> Self {
        self.circuit = circuit;
        self
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    async fn call_instance(
        &self,
        instance: &str,
        request: &TranslationRequest,
    ) -> Result<LibreResponse, TranslationError> {
        let body = LibreRequest {
            q: &request.text,
            source: request.source_or_auto(),
            target: backend_code(&request.target_language),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", instance))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::from_transport(instance, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(TranslationError::from_status(instance, status.as_u16(), body));
        }

        response.json::<LibreResponse>().await.map_err(|e| {
            if e.is_timeout() {
                TranslationError::Timeout(instance.to_string())
            } else {
                TranslationError::MalformedResponse {
                    instance: instance.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &str {
        "libretranslate"
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_configured(&self) -> bool {
        self.enabled && !self.instances.is_empty()
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        let key = CacheKey::exact(&request.text, &request.target_language);
        if let Some(cached) = self.cache.get(&key) {
            debug!("LibreTranslate cache hit for {}", request.target_language);
            return Ok(TranslationResult::translated(request, cached));
        }

        let eligible = self.circuit.eligible(&self.instances);
        if eligible.is_empty() {
            warn!(
                "All {} LibreTranslate instances are cooling down",
                self.instances.len()
            );
            return Err(TranslationError::AllInstancesUnavailable);
        }

        let mut last_error = TranslationError::AllInstancesUnavailable;

        for instance in eligible {
            debug!("LibreTranslate: trying {}", instance);

            match self.call_instance(instance, request).await {
                Ok(response) => {
                    let verdict = judge_output(&request.text, &response.translated_text);
                    if !verdict.is_acceptable(self.distrusts_identical_output()) {
                        // Another instance of the same engine gives the same answer
                        debug!("LibreTranslate {} rejected: {}", instance, verdict.reason());
                        return Err(TranslationError::UntrustedOutput(verdict.reason()));
                    }

                    self.cache.insert(key, response.translated_text.clone());

                    let (detected, confidence) = match response.detected_language {
                        Some(detected) => (
                            Some(detected.language),
                            detected.confidence.map(|c| c / 100.0),
                        ),
                        None => (None, None),
                    };

                    return Ok(TranslationResult::translated(request, response.translated_text)
                        .with_detected_source(detected)
                        .with_confidence(confidence));
                }
                Err(e) => {
                    if e.opens_circuit() {
                        self.circuit.record_failure(instance);
                        warn!("LibreTranslate {} failed, circuit opened: {}", instance, e);
                    } else {
                        warn!("LibreTranslate {} failed: {}", instance, e);
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn ok_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "translatedText": text,
            "detectedLanguage": { "language": "pt", "confidence": 90.0 }
        })
    }

    fn provider(instances: &[&MockServer]) -> LibreTranslateProvider {
        let uris: Vec<String> = instances.iter().map(|s| s.uri()).collect();
        LibreTranslateProvider::new(reqwest::Client::new(), None, &uris)
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, "en-US").with_source("pt-BR")
    }

    #[test]
    fn test_instances_deduplicated_primary_first() {
        let fallbacks = vec![
            "https://a.example".to_string(),
            "https://primary.example/".to_string(),
            "https://b.example".to_string(),
            "https://a.example".to_string(),
        ];
        let provider = LibreTranslateProvider::new(
            reqwest::Client::new(),
            Some("https://primary.example"),
            &fallbacks,
        );

        assert_eq!(
            provider.instances(),
            &["https://primary.example", "https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_is_configured() {
        let none = LibreTranslateProvider::new(reqwest::Client::new(), None, &[]);
        assert!(!none.is_configured());

        let some = LibreTranslateProvider::new(reqwest::Client::new(), Some("https://x"), &[]);
        assert!(some.is_configured());
        assert!(!some.with_enabled(false).is_configured());
    }

    #[tokio::test]
    async fn test_translate_success_sends_backend_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({
                "q": "Gruta do Lago Azul",
                "source": "pt",
                "target": "en",
                "format": "text"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Blue Lake Grotto")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&[&server]);
        let result = provider
            .translate(&request("Gruta do Lago Azul"))
            .await
            .expect("Should translate");

        assert!(result.success);
        assert_eq!(result.translated_text, "Blue Lake Grotto");
        assert_eq!(result.source_language, "pt");
        assert_eq!(result.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Waterfall")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&[&server]);
        provider.translate(&request("Cachoeira")).await.expect("first");
        let second = provider.translate(&request("Cachoeira")).await.expect("second");

        assert_eq!(second.translated_text, "Waterfall");
        assert_eq!(provider.cache().hits(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_instance_opens_circuit_and_falls_back() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("translated")))
            .expect(2)
            .mount(&fallback)
            .await;

        let provider = provider(&[&primary, &fallback]);

        let first = provider.translate(&request("um")).await.expect("fallback");
        assert_eq!(first.translated_text, "translated");
        assert!(provider.circuit().is_open(&primary.uri()));

        // Different text, so no cache hit: primary must be skipped entirely
        provider.translate(&request("dois")).await.expect("fallback again");
    }

    #[tokio::test]
    async fn test_service_unavailable_opens_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider(&[&server]);
        let err = provider.translate(&request("texto")).await.unwrap_err();

        assert_eq!(err, TranslationError::ServiceUnavailable(server.uri()));
        assert!(provider.circuit().is_open(&server.uri()));
    }

    #[tokio::test]
    async fn test_other_status_does_not_open_circuit() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"bad"}"#))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("ok")))
            .mount(&fallback)
            .await;

        let provider = provider(&[&primary, &fallback]);
        let result = provider.translate(&request("texto")).await.expect("fallback");

        assert_eq!(result.translated_text, "ok");
        assert!(!provider.circuit().is_open(&primary.uri()));
    }

    #[tokio::test]
    async fn test_malformed_body_falls_back_without_opening_circuit() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("fine")))
            .mount(&fallback)
            .await;

        let provider = provider(&[&primary, &fallback]);
        let result = provider.translate(&request("texto")).await.expect("fallback");

        assert_eq!(result.translated_text, "fine");
        assert!(!provider.circuit().is_open(&primary.uri()));
    }

    #[tokio::test]
    async fn test_connection_failure_opens_circuit() {
        let provider = LibreTranslateProvider::new(
            reqwest::Client::new(),
            Some("http://127.0.0.1:1"),
            &[],
        );

        let err = provider.translate(&request("texto")).await.unwrap_err();

        assert!(err.opens_circuit());
        assert!(provider.circuit().is_open("http://127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_timeout_opens_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = provider(&[&server]).with_timeout(Duration::from_millis(50));
        let err = provider.translate(&request("texto")).await.unwrap_err();

        assert_eq!(err, TranslationError::Timeout(server.uri()));
        assert!(provider.circuit().is_open(&server.uri()));
    }

    #[tokio::test]
    async fn test_all_circuits_open_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("never")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider(&[&server]);
        provider.circuit().record_failure(&server.uri());

        let err = provider.translate(&request("texto")).await.unwrap_err();
        assert_eq!(err, TranslationError::AllInstancesUnavailable);
    }

    #[tokio::test]
    async fn test_identical_output_is_rejected_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Bonito")))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&[&server]);
        for _ in 0..2 {
            let err = provider.translate(&request("Bonito")).await.unwrap_err();
            assert!(matches!(err, TranslationError::UntrustedOutput(_)));
        }
        assert!(provider.cache().is_empty());
    }

    #[tokio::test]
    async fn test_every_instance_failing_returns_last_error() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&b)
            .await;

        let provider = provider(&[&a, &b]);
        let err = provider.translate(&request("texto")).await.unwrap_err();

        match err {
            TranslationError::Http { status, instance, .. } => {
                assert_eq!(status, 502);
                assert_eq!(instance, b.uri());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
