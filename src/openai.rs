//! OpenAI chat-completions backed [`Extractor`].
//!
//! Sends one `POST {base_url}/chat/completions` request per call and feeds
//! the message content through the lenient parsers in
//! [`larder_core::extraction`]. Requires the `OPENAI_API_KEY` environment
//! variable.
//!
//! Requests are not retried. The `reqwest::Client` carries the configured
//! timeout, and callers additionally bound each call with
//! `tokio::time::timeout`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use larder_core::extraction::{parse_extracted_items, parse_recipe_draft, parse_substitutions};
use larder_core::models::{ExtractedItem, NewRecipe, Recipe, Substitution};
use larder_core::providers::{ExtractionKind, Extractor};
use larder_core::UpstreamError;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;

const ITEM_FIELDS: &str = "\
- name: the food item name (string)
- quantity: the amount (number, default 1 if not specified)
- unit: measurement unit (string: grams, kg, ml, l, pieces, pack, bottle, etc. Use \"pieces\" if unknown)
- category: one of dairy, produce, meat, pantry, frozen, beverages, bakery, other";

pub struct OpenAIExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAIExtractor {
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment or the
    /// HTTP client cannot be built.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "OPENAI_API_KEY environment variable not set (or set [ai] provider = \"disabled\")"
            ),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    async fn complete(
        &self,
        system: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<String, UpstreamError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(upstream_from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body_text, "OpenAI API error");
            return Err(UpstreamError::Unavailable(format!("OpenAI API error {}", status)));
        }

        let json: serde_json::Value = response.json().await.map_err(upstream_from_reqwest)?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                UpstreamError::Malformed(
                    "OpenAI response missing choices[0].message.content".into(),
                )
            })?;
        Ok(content.trim().to_string())
    }
}

pub(crate) fn upstream_from_reqwest(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else if e.is_decode() {
        UpstreamError::Malformed(e.to_string())
    } else {
        UpstreamError::Unavailable(e.to_string())
    }
}

fn items_prompt(text: &str, kind: ExtractionKind) -> (&'static str, String) {
    match kind {
        ExtractionKind::Receipt => (
            "You are a receipt parser. Extract food items accurately from receipt text and return only valid JSON.",
            format!(
                "Extract all food/grocery items from this receipt. Skip household, personal care and other non-food products. For each item, provide:\n{}\n\nIf quantity is unclear, use the pack size or estimate reasonably.\nReturn ONLY a valid JSON array with these fields. Do not include any other text.\n\nReceipt text:\n{}\n\nReturn JSON array:",
                ITEM_FIELDS, text
            ),
        ),
        ExtractionKind::Transcription | ExtractionKind::Freeform => (
            "You are a food inventory assistant. Extract food items from text accurately and return only valid JSON.",
            format!(
                "Extract all food items mentioned in this {}. For each item, provide:\n{}\n\nIf an item doesn't have a clear quantity, estimate based on context or use 1.\nReturn ONLY a valid JSON array with these fields. Do not include any other text.\n\nText:\n{}\n\nReturn JSON array:",
                kind.label(),
                ITEM_FIELDS,
                text
            ),
        ),
    }
}

const RECIPE_PROMPT: &str = r#"Extract the recipe information from this messy recipe text. Be flexible with formatting.

Return ONLY valid JSON with this structure:
{
    "name": "Recipe Name",
    "ingredients": [
        {"name": "ingredient name", "quantity": 1.0, "unit": "cups"}
    ],
    "instructions": "Cooking instructions if available, or null",
    "tags": ["optional", "short", "tags"]
}

RULES:
- ingredients: extract ALL items that look like ingredients
  - parse quantities as numbers ("1/2" -> 0.5, "1 & 1/4" -> 1.25)
  - keep units as short strings (tsp, tbsp, g, cups)
  - keep ingredient names simple ("chickpeas", not "cooked chickpeas")
- name: the recipe name if clear, otherwise derive one from the ingredients
- if quantity or unit is unclear, use quantity 1 and unit "piece"

Text:
"#;

#[async_trait]
impl Extractor for OpenAIExtractor {
    async fn extract_items(
        &self,
        text: &str,
        kind: ExtractionKind,
    ) -> Result<Vec<ExtractedItem>, UpstreamError> {
        let (system, prompt) = items_prompt(text, kind);
        let max_tokens = if kind == ExtractionKind::Receipt { 1500 } else { 1000 };
        let content = self.complete(system, prompt, max_tokens).await?;
        let parsed = parse_extracted_items(&content, kind)?;
        if parsed.dropped > 0 {
            tracing::info!(
                kind = kind.label(),
                kept = parsed.items.len(),
                dropped = parsed.dropped,
                "dropped unusable extracted items"
            );
        }
        Ok(parsed.items)
    }

    async fn extract_recipe(
        &self,
        text: &str,
        source_url: Option<&str>,
    ) -> Result<Option<NewRecipe>, UpstreamError> {
        let prompt = format!("{}{}\n\nReturn ONLY JSON, no explanations:", RECIPE_PROMPT, text);
        let content = self
            .complete(
                "You are a recipe extraction specialist. Extract recipe data from text and return ONLY valid JSON.",
                prompt,
                2000,
            )
            .await?;
        parse_recipe_draft(&content, source_url)
    }

    async fn suggest_substitutions(
        &self,
        recipe: &Recipe,
        missing: &[String],
        inventory_names: &[String],
    ) -> Result<Vec<Substitution>, UpstreamError> {
        let prompt = format!(
            "Recipe: {}\nMissing ingredients: {}\nAvailable in the kitchen: {}\n\nFor each missing ingredient that can reasonably be replaced with something available, suggest a substitution.\nReturn ONLY a valid JSON array of objects with fields \"missing\", \"substitute\" and \"note\" (a short usage hint). Omit ingredients with no sensible substitute.",
            recipe.name,
            missing.join(", "),
            inventory_names.join(", ")
        );
        let content = self
            .complete(
                "You are a practical home cook. Suggest ingredient substitutions using only what is available and return only valid JSON.",
                prompt,
                1000,
            )
            .await?;
        parse_substitutions(&content)
    }
}

/// Extractor used when `[ai] provider = "disabled"`. Every call fails with
/// [`UpstreamError::Unavailable`].
pub struct DisabledExtractor;

const DISABLED: &str = "AI extraction is disabled";

#[async_trait]
impl Extractor for DisabledExtractor {
    async fn extract_items(
        &self,
        _: &str,
        _: ExtractionKind,
    ) -> Result<Vec<ExtractedItem>, UpstreamError> {
        Err(UpstreamError::Unavailable(DISABLED.into()))
    }

    async fn extract_recipe(
        &self,
        _: &str,
        _: Option<&str>,
    ) -> Result<Option<NewRecipe>, UpstreamError> {
        Err(UpstreamError::Unavailable(DISABLED.into()))
    }

    async fn suggest_substitutions(
        &self,
        _: &Recipe,
        _: &[String],
        _: &[String],
    ) -> Result<Vec<Substitution>, UpstreamError> {
        Err(UpstreamError::Unavailable(DISABLED.into()))
    }
}

/// Build the extractor selected by `[ai] provider`.
pub fn create_extractor(config: &AiConfig) -> Result<Arc<dyn Extractor>> {
    if !config.is_enabled() {
        tracing::info!("AI extraction disabled");
        return Ok(Arc::new(DisabledExtractor));
    }
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIExtractor::new(config)?)),
        other => bail!("Unknown ai provider: {}", other),
    }
}
