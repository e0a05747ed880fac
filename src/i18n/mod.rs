//! Supported languages and language code handling.
//!
//! - `registry`: Single source of truth for supported languages and their metadata
//! - `language`: Validated `Language` type plus backend code canonicalization

mod language;
mod registry;

pub use language::{backend_code, display_name, Language};
pub use registry::{LanguageConfig, LanguageRegistry};
