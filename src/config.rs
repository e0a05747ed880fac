use crate::i18n::Language;
use anyhow::{Context, Result};

/// Public LibreTranslate instances tried after the configured primary.
pub const DEFAULT_LIBRETRANSLATE_FALLBACKS: &[&str] = &[
    "https://libretranslate.com",
    "https://translate.argosopentech.com",
    "https://libretranslate.de",
];

pub const DEFAULT_GOOGLE_TRANSLATE_API_URL: &str =
    "https://translation.googleapis.com/language/translate/v2";

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Server
    pub port: u16,
    pub api_key: Option<String>,

    // Languages
    pub source_language: Language,
    pub target_languages: Vec<Language>,

    // LibreTranslate (free multi-instance backend)
    pub libretranslate_enabled: bool,
    pub libretranslate_url: Option<String>,
    pub libretranslate_api_key: Option<String>,
    pub libretranslate_fallbacks: Vec<String>,

    // Google Cloud Translation (keyed backend)
    pub google_translate_api_key: Option<String>,
    pub google_translate_api_url: String,

    // OpenAI (generative backend)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // Backfill
    pub backfill_delay_ms: u64,
    pub backfill_schedule: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let source_language = match non_empty_var("SOURCE_LANGUAGE") {
            Some(code) => Language::from_code(&code).context("Invalid SOURCE_LANGUAGE")?,
            None => Language::canonical(),
        };

        let target_languages = match non_empty_var("TARGET_LANGUAGES") {
            Some(codes) => parse_languages(&codes).context("Invalid TARGET_LANGUAGES")?,
            None => Language::targets(),
        }
        .into_iter()
        .filter(|lang| *lang != source_language)
        .collect();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            port: parse_var("PORT").unwrap_or(8080),
            api_key: non_empty_var("API_KEY"),

            source_language,
            target_languages,

            libretranslate_enabled: parse_var("LIBRETRANSLATE_ENABLED").unwrap_or(true),
            libretranslate_url: non_empty_var("LIBRETRANSLATE_URL"),
            libretranslate_api_key: non_empty_var("LIBRETRANSLATE_API_KEY"),
            libretranslate_fallbacks: match std::env::var("LIBRETRANSLATE_FALLBACKS") {
                Ok(list) => split_list(&list),
                Err(_) => DEFAULT_LIBRETRANSLATE_FALLBACKS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },

            google_translate_api_key: non_empty_var("GOOGLE_TRANSLATE_API_KEY"),
            google_translate_api_url: non_empty_var("GOOGLE_TRANSLATE_API_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_TRANSLATE_API_URL.to_string()),

            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: non_empty_var("OPENAI_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_url: non_empty_var("OPENAI_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),

            backfill_delay_ms: parse_var("BACKFILL_DELAY_MS").unwrap_or(200),
            backfill_schedule: match std::env::var("BACKFILL_SCHEDULE") {
                Ok(expr) if expr.trim().is_empty() => None,
                Ok(expr) => Some(expr.trim().to_string()),
                Err(_) => Some("0 0 6 * * *".to_string()),
            },
        })
    }

    /// Configuration with every backend disabled, for tests and tooling.
    pub fn offline(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            port: 8080,
            api_key: None,
            source_language: Language::canonical(),
            target_languages: Language::targets(),
            libretranslate_enabled: false,
            libretranslate_url: None,
            libretranslate_api_key: None,
            libretranslate_fallbacks: Vec::new(),
            google_translate_api_key: None,
            google_translate_api_url: DEFAULT_GOOGLE_TRANSLATE_API_URL.to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            backfill_delay_ms: 0,
            backfill_schedule: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_languages(value: &str) -> Result<Vec<Language>> {
    let mut languages = Vec::new();
    for code in split_list(value) {
        let language = Language::from_code(&code)?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(languages)
}
