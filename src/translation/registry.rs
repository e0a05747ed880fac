use super::{
    GenerativeProvider, GoogleTranslateProvider, LibreTranslateProvider, TranslationProvider,
};
use crate::config::Config;
use std::sync::Arc;

/// Every provider implementation shipped with the crate, in default
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    LibreTranslate,
    GoogleCloud,
    Generative,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::LibreTranslate,
        ProviderKind::GoogleCloud,
        ProviderKind::Generative,
    ];

    pub fn default_priority(self) -> u8 {
        match self {
            ProviderKind::LibreTranslate => 1,
            ProviderKind::GoogleCloud => 2,
            ProviderKind::Generative => 3,
        }
    }

    pub fn build(self, config: &Config, client: &reqwest::Client) -> Arc<dyn TranslationProvider> {
        match self {
            ProviderKind::LibreTranslate => Arc::new(
                LibreTranslateProvider::new(
                    client.clone(),
                    config.libretranslate_url.as_deref(),
                    &config.libretranslate_fallbacks,
                )
                .with_api_key(config.libretranslate_api_key.clone())
                .with_enabled(config.libretranslate_enabled)
                .with_priority(self.default_priority()),
            ),
            ProviderKind::GoogleCloud => Arc::new(
                GoogleTranslateProvider::new(
                    client.clone(),
                    &config.google_translate_api_url,
                    config.google_translate_api_key.clone(),
                )
                .with_priority(self.default_priority()),
            ),
            ProviderKind::Generative => Arc::new(
                GenerativeProvider::new(
                    client.clone(),
                    &config.openai_api_url,
                    config.openai_api_key.clone(),
                    &config.openai_model,
                )
                .with_priority(self.default_priority()),
            ),
        }
    }
}
