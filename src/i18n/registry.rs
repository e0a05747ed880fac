//! Language registry: Single source of truth for all supported languages.
//!
//! The registry is immutable static data, initialized once with `OnceLock`.
//! It knows which language content is authored in (the canonical source
//! language) and which languages content may be translated into.

use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Project language code (e.g., "pt-BR", "en-US", "es")
    pub code: &'static str,

    /// English name of the language, used in generative prompts
    pub name: &'static str,

    /// Native name of the language (e.g., "Português", "Español")
    pub native_name: &'static str,

    /// Whether this is the canonical/source language (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,
}

/// Global language registry.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    ///
    /// Lookup is case-insensitive so that `pt-br` and `pt-BR` resolve to the
    /// same entry.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get every enabled language except the canonical one.
    pub fn list_targets(&self) -> Vec<&LanguageConfig> {
        self.languages
            .iter()
            .filter(|lang| lang.enabled && !lang.is_canonical)
            .collect()
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one canonical language.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }
}

/// Content is authored in Brazilian Portuguese and published in four
/// additional languages.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "pt-BR",
            name: "Portuguese",
            native_name: "Português",
            is_canonical: true,
            enabled: true,
        },
        LanguageConfig {
            code: "en-US",
            name: "English",
            native_name: "English",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_canonical: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_portuguese() {
        let config = LanguageRegistry::get()
            .get_by_code("pt-BR")
            .expect("pt-BR should exist");

        assert_eq!(config.name, "Portuguese");
        assert_eq!(config.native_name, "Português");
        assert!(config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_is_case_insensitive() {
        let registry = LanguageRegistry::get();
        let config = registry.get_by_code("en-us").expect("Should resolve");
        assert_eq!(config.code, "en-US");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LanguageRegistry::get().get_by_code("ja-JP").is_none());
    }

    #[test]
    fn test_list_targets_excludes_canonical() {
        let targets = LanguageRegistry::get().list_targets();

        assert_eq!(targets.len(), 4);
        assert!(targets.iter().all(|lang| !lang.is_canonical));
        assert!(targets.iter().any(|lang| lang.code == "en-US"));
        assert!(targets.iter().any(|lang| lang.code == "de"));
    }

    #[test]
    fn test_list_enabled_contains_all_five() {
        assert_eq!(LanguageRegistry::get().list_enabled().len(), 5);
    }

    #[test]
    fn test_canonical_returns_portuguese() {
        let canonical = LanguageRegistry::get().canonical();
        assert_eq!(canonical.code, "pt-BR");
    }
}
