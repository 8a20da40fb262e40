//! Unified recipe finder.
//!
//! Merges the user's saved recipes with live results from the external
//! recipe search, annotates each with how well the inventory covers it,
//! and ranks saved recipes first. If the search service fails the finder
//! still answers from the saved library and reports why.

use larder_core::matching::{rank_recipes, MatchedRecipe};
use larder_core::models::Recipe;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::ServiceResult;

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 20;
/// Inventory names used as the search query when no preferences are given.
const QUERY_ITEMS: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindRequest {
    pub preferences: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FindResult {
    pub recipes: Vec<MatchedRecipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_error: Option<String>,
}

fn preference_terms(preferences: &str) -> Vec<String> {
    preferences
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn matches_preferences(recipe: &Recipe, terms: &[String]) -> bool {
    let name = recipe.name.to_lowercase();
    terms.iter().any(|term| {
        name.contains(term.as_str())
            || recipe.tags.iter().any(|t| t.to_lowercase().contains(term.as_str()))
            || recipe
                .ingredients
                .iter()
                .any(|i| i.name.to_lowercase().contains(term.as_str()))
    })
}

pub async fn find_recipes(ctx: &AppContext, request: FindRequest) -> ServiceResult<FindResult> {
    let limit = request.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let preferences = request
        .preferences
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let inventory = ctx.inventory_names().await?;
    let strategy = ctx.settings.strategy;

    let saved = ctx.recipes.list_all().await?;
    let terms = preferences.map(preference_terms).unwrap_or_default();
    let mut recipes: Vec<MatchedRecipe> = saved
        .iter()
        .filter(|r| terms.is_empty() || matches_preferences(r, &terms))
        .map(|r| MatchedRecipe::from_saved(r, &inventory, strategy))
        .collect();

    let query = match preferences {
        Some(p) => p.to_string(),
        None => inventory_query(&inventory),
    };

    let mut external_error = None;
    if query.is_empty() {
        external_error = Some("No preferences given and the inventory is empty".to_string());
    } else {
        match ctx
            .with_search_deadline(ctx.recipe_search.search(&query, limit))
            .await
        {
            Ok(found) => {
                tracing::debug!(query = %query, results = found.len(), "external recipes found");
                recipes.extend(
                    found
                        .into_iter()
                        .take(limit)
                        .map(|r| MatchedRecipe::from_external(r, &inventory, strategy)),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "recipe search failed; using saved recipes only");
                external_error = Some(e.to_string());
            }
        }
    }

    rank_recipes(&mut recipes);
    Ok(FindResult {
        recipes,
        external_error,
    })
}

/// The first [`QUERY_ITEMS`] inventory names in stored order, so a given
/// inventory always produces the same query.
fn inventory_query(inventory: &[String]) -> String {
    inventory
        .iter()
        .take(QUERY_ITEMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_terms_split_on_commas_and_spaces() {
        assert_eq!(
            preference_terms(" Vegetarian,  quick pasta "),
            vec!["vegetarian", "quick", "pasta"]
        );
        assert!(preference_terms(" , ").is_empty());
    }

    #[test]
    fn inventory_query_uses_a_stable_prefix() {
        let inventory: Vec<String> = (1..=12).map(|n| format!("item{}", n)).collect();
        let query = inventory_query(&inventory);
        assert!(query.starts_with("item1, item2, "));
        assert!(query.ends_with(", item10"));
        assert_eq!(query, inventory_query(&inventory));
        assert_eq!(inventory_query(&[]), "");
    }
}
