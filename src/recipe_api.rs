//! API Ninjas backed [`RecipeSearch`].
//!
//! `GET {url}?ingredients=<query>` with the `X-Api-Key` header taken from
//! `API_NINJAS_KEY`. The service answers with a JSON array of
//! `{title, ingredients, instructions, servings}` objects, where
//! `ingredients` is either a list of strings or a single `|`-separated
//! string.

use anyhow::{bail, Result};
use async_trait::async_trait;
use larder_core::models::{ExternalRecipe, Ingredient};
use larder_core::providers::RecipeSearch;
use larder_core::UpstreamError;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RecipeSearchConfig;
use crate::openai::upstream_from_reqwest;

pub struct ApiNinjasSearch {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl ApiNinjasSearch {
    pub fn new(config: &RecipeSearchConfig) -> Result<Self> {
        let api_key = match std::env::var("API_NINJAS_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "API_NINJAS_KEY environment variable not set (or set [recipe_search] provider = \"disabled\")"
            ),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl RecipeSearch for ApiNinjasSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ExternalRecipe>, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .header("X-Api-Key", &self.api_key)
            .query(&[("ingredients", query)])
            .send()
            .await
            .map_err(upstream_from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body_text, "recipe search API error");
            return Err(UpstreamError::Unavailable(format!(
                "recipe search API error {}",
                status
            )));
        }

        let json: Value = response.json().await.map_err(upstream_from_reqwest)?;
        let recipes = parse_recipe_results(json, limit)?;
        tracing::debug!(query, results = recipes.len(), "recipe search complete");
        Ok(recipes)
    }
}

/// Convert a search response into at most `limit` recipes, skipping
/// entries without a title and repeated titles.
pub fn parse_recipe_results(
    json: Value,
    limit: usize,
) -> Result<Vec<ExternalRecipe>, UpstreamError> {
    let Value::Array(entries) = json else {
        return Err(UpstreamError::Malformed(
            "recipe search response is not a JSON array".into(),
        ));
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in entries {
        if out.len() >= limit {
            break;
        }
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let title = match obj.get("title").and_then(Value::as_str).map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => continue,
        };
        if !seen.insert(title.to_lowercase()) {
            continue;
        }
        out.push(ExternalRecipe {
            name: title,
            ingredients: parse_ingredient_lines(obj.get("ingredients")),
            instructions: obj
                .get("instructions")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            servings: match obj.get("servings") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
        });
    }
    Ok(out)
}

fn parse_ingredient_lines(value: Option<&Value>) -> Vec<Ingredient> {
    let lines: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split('|').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .map(|name| Ingredient {
            name,
            quantity: 1.0,
            unit: String::new(),
        })
        .collect()
}

/// Recipe search used when `[recipe_search] provider = "disabled"`.
pub struct DisabledRecipeSearch;

#[async_trait]
impl RecipeSearch for DisabledRecipeSearch {
    async fn search(&self, _: &str, _: usize) -> Result<Vec<ExternalRecipe>, UpstreamError> {
        Err(UpstreamError::Unavailable("recipe search is disabled".into()))
    }
}

/// Build the recipe search selected by `[recipe_search] provider`.
pub fn create_recipe_search(config: &RecipeSearchConfig) -> Result<Arc<dyn RecipeSearch>> {
    if !config.is_enabled() {
        tracing::info!("external recipe search disabled");
        return Ok(Arc::new(DisabledRecipeSearch));
    }
    match config.provider.as_str() {
        "api-ninjas" => Ok(Arc::new(ApiNinjasSearch::new(config)?)),
        other => bail!("Unknown recipe_search provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_list_and_pipe_separated_ingredients() {
        let recipes = parse_recipe_results(
            json!([
                {"title": "Pancakes", "ingredients": ["1 cup flour", "2 eggs"], "servings": "4 servings", "instructions": "Mix."},
                {"title": "Omelette", "ingredients": "3 eggs| salt |", "servings": 1}
            ]),
            5,
        )
        .unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].ingredients[0].name, "1 cup flour");
        assert_eq!(recipes[0].servings.as_deref(), Some("4 servings"));
        let names: Vec<_> = recipes[1].ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["3 eggs", "salt"]);
        assert_eq!(recipes[1].servings.as_deref(), Some("1"));
        assert_eq!(recipes[1].instructions, "");
    }

    #[test]
    fn deduplicates_titles_and_honours_limit() {
        let recipes = parse_recipe_results(
            json!([
                {"title": "Soup"},
                {"title": "soup"},
                {"title": ""},
                {"title": "Stew"},
                {"title": "Salad"}
            ]),
            2,
        )
        .unwrap();
        let names: Vec<_> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Soup", "Stew"]);
    }

    #[test]
    fn non_array_is_malformed() {
        let err = parse_recipe_results(json!({"error": "bad key"}), 5).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[tokio::test]
    async fn disabled_provider_builds_without_a_key() {
        let config = RecipeSearchConfig {
            provider: "disabled".to_string(),
            ..RecipeSearchConfig::default()
        };
        let search = create_recipe_search(&config).unwrap();
        let err = search.search("rice", 5).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
    }
}
