//! Capability traits for the external services Larder depends on.
//!
//! The application never talks to a language model or a recipe API
//! directly; it holds an `Arc<dyn Extractor>` and an
//! `Arc<dyn RecipeSearch>`. Production implementations live in the app
//! crate, and tests substitute deterministic fakes.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use async_trait::async_trait;

use crate::models::{ExtractedItem, ExternalRecipe, NewRecipe, Recipe, Substitution};

/// Failure of an external capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The call did not finish within its deadline.
    Timeout,
    /// The service is disabled, unreachable, or answered with an error.
    Unavailable(String),
    /// The service answered, but not with anything parseable.
    Malformed(String),
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::Timeout => write!(f, "upstream request timed out"),
            UpstreamError::Unavailable(msg) => write!(f, "upstream unavailable: {}", msg),
            UpstreamError::Malformed(msg) => write!(f, "malformed upstream response: {}", msg),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// What kind of text is handed to [`Extractor::extract_items`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    /// Text extracted from a shopping receipt.
    Receipt,
    /// A voice-memo transcription.
    Transcription,
    /// A short list typed by the user.
    Freeform,
}

impl ExtractionKind {
    /// Human-readable label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionKind::Receipt => "receipt",
            ExtractionKind::Transcription => "transcription",
            ExtractionKind::Freeform => "text",
        }
    }
}

/// Language-model backed extraction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract food items from free text. Elements that cannot be parsed are
    /// dropped; an empty result is not an error.
    async fn extract_items(
        &self,
        text: &str,
        kind: ExtractionKind,
    ) -> Result<Vec<ExtractedItem>, UpstreamError>;

    /// Extract a recipe draft from page text or pasted text. `Ok(None)`
    /// means the model answered but no usable recipe was found.
    async fn extract_recipe(
        &self,
        text: &str,
        source_url: Option<&str>,
    ) -> Result<Option<NewRecipe>, UpstreamError>;

    /// Suggest replacements for `missing` ingredients of `recipe` using
    /// what is on hand.
    async fn suggest_substitutions(
        &self,
        recipe: &Recipe,
        missing: &[String],
        inventory_names: &[String],
    ) -> Result<Vec<Substitution>, UpstreamError>;
}

/// External recipe search by ingredients or free-text preferences.
#[async_trait]
pub trait RecipeSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ExternalRecipe>, UpstreamError>;
}
