//! Language type and backend code canonicalization.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use serde::{Serialize, Serializer};

/// A language validated against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const PORTUGUESE: Language = Language { code: "pt-BR" };
    pub const ENGLISH: Language = Language { code: "en-US" };
    pub const SPANISH: Language = Language { code: "es" };
    pub const FRENCH: Language = Language { code: "fr" };
    pub const GERMAN: Language = Language { code: "de" };

    /// Create a Language from a project language code.
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is known and enabled
    /// * `Err` if the code is not found or the language is disabled
    pub fn from_code(code: &str) -> Result<Language> {
        let registry = LanguageRegistry::get();

        match registry.get_by_code(code.trim()) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", code),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// The language content is authored in.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    /// Every enabled translation target, in registry order.
    pub fn targets() -> Vec<Language> {
        LanguageRegistry::get()
            .list_targets()
            .into_iter()
            .map(|config| Language { code: config.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// # Panics
    /// Panics if the code is not in the registry, which cannot happen for a
    /// Language built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    /// English name of the language (e.g., "Spanish").
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }

    /// Two-letter code understood by translation backends.
    pub fn backend_code(&self) -> String {
        backend_code(self.code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

/// Project code to backend code table.
const BACKEND_CODES: &[(&str, &str)] = &[
    ("pt-BR", "pt"),
    ("pt-PT", "pt"),
    ("en-US", "en"),
    ("en-GB", "en"),
    ("es-ES", "es"),
    ("es-MX", "es"),
    ("fr-FR", "fr"),
    ("de-DE", "de"),
    ("it-IT", "it"),
    ("zh-CN", "zh"),
    ("ja-JP", "ja"),
];

/// Canonicalize a project language code (e.g. `pt-BR`) to the two-letter
/// code translation backends expect. Codes missing from the table fall back
/// to their primary subtag.
pub fn backend_code(code: &str) -> String {
    let code = code.trim();
    BACKEND_CODES
        .iter()
        .find(|(project, _)| project.eq_ignore_ascii_case(code))
        .map(|(_, backend)| backend.to_string())
        .unwrap_or_else(|| {
            code.split('-')
                .next()
                .unwrap_or(code)
                .to_ascii_lowercase()
        })
}

/// English display name for any code, falling back to the code itself.
pub fn display_name(code: &str) -> String {
    LanguageRegistry::get()
        .get_by_code(code)
        .or_else(|| {
            let primary = backend_code(code);
            LanguageRegistry::get()
                .list_enabled()
                .into_iter()
                .find(|lang| backend_code(lang.code) == primary)
        })
        .map(|config| config.name.to_string())
        .unwrap_or_else(|| code.to_string())
}
