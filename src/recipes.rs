//! Personal recipe library operations.

use larder_core::matching::{match_ingredients_with, MatchedRecipe};
use larder_core::models::{Ingredient, NewRecipe, Recipe, RecipePatch, Substitution};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

/// Filters for [`search_recipes`]. Absent filters match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    /// Case-insensitive substring of the recipe name.
    pub q: Option<String>,
    /// Every tag must be present (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
    /// At least one ingredient must match.
    #[serde(default)]
    pub ingredients: Vec<String>,
}

/// Result of matching one saved recipe against the inventory, with
/// substitution suggestions for what is missing.
#[derive(Debug, Serialize)]
pub struct Adaptation {
    pub recipe_id: String,
    pub match_percentage: u8,
    pub has_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
    pub substitutions: Vec<Substitution>,
}

fn check_ingredients(ingredients: &[Ingredient]) -> ServiceResult<()> {
    for ingredient in ingredients {
        if ingredient.name.trim().is_empty() {
            return Err(ServiceError::validation("Ingredient names must not be empty"));
        }
        if !ingredient.quantity.is_finite() || ingredient.quantity < 0.0 {
            return Err(ServiceError::validation(format!(
                "quantity for '{}' must be a non-negative number",
                ingredient.name.trim()
            )));
        }
    }
    Ok(())
}

pub async fn create_recipe(ctx: &AppContext, draft: NewRecipe) -> ServiceResult<Recipe> {
    if draft.name.trim().is_empty() {
        return Err(ServiceError::validation("Recipe name is required"));
    }
    check_ingredients(&draft.ingredients)?;
    let recipe = ctx.recipes.add(draft).await?;
    tracing::info!(id = %recipe.id, name = %recipe.name, "recipe saved");
    Ok(recipe)
}

pub async fn get_recipe(ctx: &AppContext, id: &str) -> ServiceResult<Recipe> {
    ctx.recipes
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", id))
}

pub async fn update_recipe(
    ctx: &AppContext,
    id: &str,
    patch: RecipePatch,
) -> ServiceResult<Recipe> {
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        return Err(ServiceError::validation("Recipe name must not be empty"));
    }
    if let Some(ingredients) = &patch.ingredients {
        check_ingredients(ingredients)?;
    }
    ctx.recipes
        .update(id, patch)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", id))
}

pub async fn delete_recipe(ctx: &AppContext, id: &str) -> ServiceResult<()> {
    if !ctx.recipes.delete(id).await? {
        return Err(ServiceError::not_found("Recipe", id));
    }
    tracing::info!(id, "recipe deleted");
    Ok(())
}

pub async fn search_recipes(ctx: &AppContext, query: &RecipeQuery) -> ServiceResult<Vec<Recipe>> {
    let name_filter = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let ingredients: Vec<&str> = query
        .ingredients
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();

    let recipes = ctx.recipes.list_all().await?;
    Ok(recipes
        .into_iter()
        .filter(|r| match &name_filter {
            Some(q) => r.name.to_lowercase().contains(q),
            None => true,
        })
        .filter(|r| query.tags.iter().all(|t| t.trim().is_empty() || r.has_tag(t)))
        .filter(|r| {
            ingredients.is_empty()
                || !match_ingredients_with(
                    &r.ingredient_names(),
                    &ingredients,
                    ctx.settings.strategy,
                )
                .has
                .is_empty()
        })
        .collect())
}

pub async fn recipes_by_tag(ctx: &AppContext, tag: &str) -> ServiceResult<Vec<Recipe>> {
    let query = RecipeQuery {
        tags: vec![tag.to_string()],
        ..Default::default()
    };
    search_recipes(ctx, &query).await
}

/// Saved recipes that use at least one of `ingredients`, most matched
/// ingredients first.
pub async fn match_recipes(
    ctx: &AppContext,
    ingredients: &[String],
) -> ServiceResult<Vec<MatchedRecipe>> {
    if ingredients.iter().all(|i| i.trim().is_empty()) {
        return Err(ServiceError::validation("At least one ingredient is required"));
    }
    let recipes = ctx.recipes.list_all().await?;
    let mut matched: Vec<MatchedRecipe> = recipes
        .iter()
        .map(|r| MatchedRecipe::from_saved(r, ingredients, ctx.settings.strategy))
        .filter(|m| !m.has_ingredients.is_empty())
        .collect();
    matched.sort_by(|a, b| b.has_ingredients.len().cmp(&a.has_ingredients.len()));
    Ok(matched)
}

/// Match a saved recipe against the inventory and ask for substitutions
/// covering what is missing. Nothing missing means no AI call.
pub async fn adapt_recipe(ctx: &AppContext, id: &str) -> ServiceResult<Adaptation> {
    let recipe = get_recipe(ctx, id).await?;
    let inventory = ctx.inventory_names().await?;
    let matched =
        match_ingredients_with(&recipe.ingredient_names(), &inventory, ctx.settings.strategy);

    let substitutions = if matched.missing.is_empty() {
        Vec::new()
    } else {
        ctx.with_ai_deadline(ctx.extractor.suggest_substitutions(
            &recipe,
            &matched.missing,
            &inventory,
        ))
        .await?
    };

    Ok(Adaptation {
        recipe_id: recipe.id,
        match_percentage: matched.match_percentage,
        has_ingredients: matched.has,
        missing_ingredients: matched.missing,
        substitutions,
    })
}
