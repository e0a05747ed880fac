use thiserror::Error;

/// Failure modes of a single translation attempt.
///
/// Providers return these from `translate`; the manager never lets them
/// escape `translate_text`, folding them into a failed `TranslationResult`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("provider {0} is not configured")]
    NotConfigured(String),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("network error contacting {instance}: {message}")]
    Network { instance: String, message: String },

    #[error("rate limited by {0} (429)")]
    RateLimited(String),

    #[error("service unavailable at {0} (503)")]
    ServiceUnavailable(String),

    #[error("HTTP {status} from {instance}: {body}")]
    Http {
        instance: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {instance}: {message}")]
    MalformedResponse { instance: String, message: String },

    #[error("provider returned untranslated output ({0})")]
    UntrustedOutput(&'static str),

    #[error("all translation instances are temporarily unavailable")]
    AllInstancesUnavailable,

    #[error("no translation provider configured")]
    NoProviderConfigured,

    #[error("all translation providers failed: {last_error}")]
    AllProvidersExhausted { last_error: String },
}

impl TranslationError {
    /// Whether this failure should open the circuit of the instance that produced it.
    pub fn opens_circuit(&self) -> bool {
        matches!(
            self,
            TranslationError::Timeout(_)
                | TranslationError::Network { .. }
                | TranslationError::RateLimited(_)
                | TranslationError::ServiceUnavailable(_)
        )
    }

    /// Whether repeating the same request may succeed.
    /// 5xx and network errors are transient. Timeouts and 429 are not
    /// repeated against the same backend.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Network { .. }
            | TranslationError::ServiceUnavailable(_)
            | TranslationError::MalformedResponse { .. } => true,
            TranslationError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classify a reqwest transport error against the instance it targeted.
    pub fn from_transport(instance: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::Timeout(instance.to_string())
        } else {
            TranslationError::Network {
                instance: instance.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(instance: &str, status: u16, body: String) -> Self {
        match status {
            429 => TranslationError::RateLimited(instance.to_string()),
            503 => TranslationError::ServiceUnavailable(instance.to_string()),
            _ => TranslationError::Http {
                instance: instance.to_string(),
                status,
                body,
            },
        }
    }
}
