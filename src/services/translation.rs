//! Translation Collaborator
//!
//! Maps free text into a target language. The default implementation
//! returns the text unchanged; a real translation service plugs in behind
//! the same trait.

use async_trait::async_trait;

use crate::utils::error::AppResult;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language` (ISO 639-1 code).
    async fn translate(&self, text: &str, target_language: &str) -> AppResult<String>;
}

/// Translator that performs no translation
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> AppResult<String> {
        Ok(text.to_string())
    }
}

/// Whether a language code or name denotes English
pub fn is_english(language: &str) -> bool {
    matches!(
        language.trim().to_lowercase().as_str(),
        "" | "en" | "eng" | "english" | "en-us" | "en-gb"
    )
}
