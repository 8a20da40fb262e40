//! Ingredient matching and recipe ranking.
//!
//! Everything here is pure: no I/O, no clock, no randomness. The HTTP
//! layer, the stores, and the external services all sit outside.
//!
//! # Matching rule
//!
//! A recipe ingredient is *had* when, compared case-insensitively after
//! trimming, it contains an inventory item name or is contained by one.
//! `"chicken"` matches `"chicken breast"` and vice versa.
//!
//! The plain substring rule has known false positives (`"pea"` matches
//! `"peanut"`). [`MatchStrategy::WholeWord`] keeps the symmetric
//! containment but only accepts occurrences that start and end on word
//! boundaries.
//!
//! # Ranking rule
//!
//! Saved recipes always come before recipes from the external search, then
//! fewer missing ingredients first. The sort is stable.

use serde::{Deserialize, Serialize};

use crate::models::{ExternalRecipe, Ingredient, Recipe};

/// How two ingredient names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Symmetric case-insensitive substring containment.
    #[default]
    Substring,
    /// Symmetric containment aligned on word boundaries.
    WholeWord,
}

/// Result of matching one recipe against the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientMatch {
    /// Ingredients found in the inventory, in recipe order.
    pub has: Vec<String>,
    /// Ingredients not found, in recipe order.
    pub missing: Vec<String>,
    /// `round(100 * |has| / max(1, total))`, never 100 while anything is missing.
    pub match_percentage: u8,
}

impl IngredientMatch {
    pub fn total(&self) -> usize {
        self.has.len() + self.missing.len()
    }
}

/// Match with the default [`MatchStrategy::Substring`] rule.
pub fn match_ingredients<S, T>(recipe_ingredients: &[S], inventory_names: &[T]) -> IngredientMatch
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    match_ingredients_with(recipe_ingredients, inventory_names, MatchStrategy::Substring)
}

/// Match recipe ingredient names against inventory item names.
///
/// Blank names on either side are ignored. Repeated recipe ingredients
/// (case-insensitive) are counted once.
pub fn match_ingredients_with<S, T>(
    recipe_ingredients: &[S],
    inventory_names: &[T],
    strategy: MatchStrategy,
) -> IngredientMatch
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let inventory: Vec<String> = inventory_names
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut has = Vec::new();
    let mut missing = Vec::new();

    for raw in recipe_ingredients {
        let display = raw.as_ref().trim();
        let key = display.to_lowercase();
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        if inventory.iter().any(|inv| names_match(&key, inv, strategy)) {
            has.push(display.to_string());
        } else {
            missing.push(display.to_string());
        }
    }

    let match_percentage = percentage(has.len(), has.len() + missing.len());
    IngredientMatch {
        has,
        missing,
        match_percentage,
    }
}

/// Whether two already-lowercased names match under `strategy`.
pub fn names_match(a: &str, b: &str, strategy: MatchStrategy) -> bool {
    match strategy {
        MatchStrategy::Substring => a.contains(b) || b.contains(a),
        MatchStrategy::WholeWord => contains_whole(a, b) || contains_whole(b, a),
    }
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumeric
/// characters (or the string ends) on both sides.
pub fn contains_whole(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

fn percentage(has: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * has as f64 / total as f64).round() as u8;
    if has < total {
        pct.min(99)
    } else {
        pct
    }
}

// ============ Ranking ============

/// Where a ranked recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeOrigin {
    Saved,
    Api,
}

/// A recipe annotated with its match against the inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRecipe {
    /// Library id for saved recipes; `None` for external results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub source: RecipeOrigin,
    pub ingredients: Vec<Ingredient>,
    pub instructions: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,
    pub match_percentage: u8,
    pub has_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
    pub total_ingredients: usize,
}

impl MatchedRecipe {
    pub fn from_saved<T: AsRef<str>>(
        recipe: &Recipe,
        inventory_names: &[T],
        strategy: MatchStrategy,
    ) -> Self {
        let m = match_ingredients_with(&recipe.ingredient_names(), inventory_names, strategy);
        Self {
            id: Some(recipe.id.clone()),
            name: recipe.name.clone(),
            source: RecipeOrigin::Saved,
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            tags: recipe.tags.clone(),
            servings: None,
            match_percentage: m.match_percentage,
            total_ingredients: m.total(),
            has_ingredients: m.has,
            missing_ingredients: m.missing,
        }
    }

    pub fn from_external<T: AsRef<str>>(
        recipe: ExternalRecipe,
        inventory_names: &[T],
        strategy: MatchStrategy,
    ) -> Self {
        let names: Vec<&str> = recipe.ingredients.iter().map(|i| i.name.as_str()).collect();
        let m = match_ingredients_with(&names, inventory_names, strategy);
        Self {
            id: None,
            name: recipe.name,
            source: RecipeOrigin::Api,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            tags: Vec::new(),
            servings: recipe.servings,
            match_percentage: m.match_percentage,
            total_ingredients: m.total(),
            has_ingredients: m.has,
            missing_ingredients: m.missing,
        }
    }
}

/// Stable sort: saved before api, then ascending missing-ingredient count.
pub fn rank_recipes(recipes: &mut [MatchedRecipe]) {
    recipes.sort_by_key(|r| (r.source != RecipeOrigin::Saved, r.missing_ingredients.len()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(name: &str, ingredients: &[&str]) -> ExternalRecipe {
        ExternalRecipe {
            name: name.to_string(),
            ingredients: ingredients
                .iter()
                .map(|n| Ingredient {
                    name: n.to_string(),
                    quantity: 1.0,
                    unit: String::new(),
                })
                .collect(),
            instructions: String::new(),
            servings: None,
        }
    }

    fn saved(name: &str, ingredients: &[&str]) -> Recipe {
        Recipe {
            id: format!("id-{}", name),
            name: name.to_string(),
            ingredients: external(name, ingredients).ingredients,
            instructions: String::new(),
            tags: Vec::new(),
            source: Default::default(),
            source_url: None,
            notes: String::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn worked_example() {
        let m = match_ingredients(
            &["chicken", "garlic", "onion"],
            &["chicken breast", "soy sauce", "garlic"],
        );
        assert_eq!(m.has, vec!["chicken", "garlic"]);
        assert_eq!(m.missing, vec!["onion"]);
        assert_eq!(m.match_percentage, 67);
    }

    #[test]
    fn containment_is_symmetric_and_case_insensitive() {
        let m = match_ingredients(&["Chicken Breast Fillet"], &["CHICKEN"]);
        assert_eq!(m.has, vec!["Chicken Breast Fillet"]);
        assert_eq!(m.match_percentage, 100);
    }

    #[test]
    fn empty_recipe_is_zero_not_error() {
        let m = match_ingredients::<&str, &str>(&[], &["milk"]);
        assert_eq!(m.match_percentage, 0);
        assert!(m.has.is_empty() && m.missing.is_empty());
    }

    #[test]
    fn blank_inventory_names_do_not_match_everything() {
        let m = match_ingredients(&["saffron"], &["", "   "]);
        assert_eq!(m.missing, vec!["saffron"]);
        assert_eq!(m.match_percentage, 0);
    }

    #[test]
    fn duplicate_ingredients_count_once() {
        let m = match_ingredients(&["salt", "Salt", "pepper"], &["salt"]);
        assert_eq!(m.total(), 2);
        assert_eq!(m.match_percentage, 50);
    }

    #[test]
    fn percentage_is_100_iff_nothing_missing() {
        let many: Vec<String> = (0..250).map(|i| format!("spice{}", i)).collect();
        let inventory: Vec<String> = many[..249].to_vec();
        let m = match_ingredients(&many, &inventory);
        assert_eq!(m.missing.len(), 1);
        assert!(m.match_percentage < 100);

        let full = match_ingredients(&many, &many);
        assert!(full.missing.is_empty());
        assert_eq!(full.match_percentage, 100);
    }

    #[test]
    fn percentage_stays_in_range() {
        for has in 0..=12usize {
            for total in has.max(1)..=12usize {
                let p = percentage(has, total);
                assert!(p <= 100);
                assert_eq!(p == 100, has == total);
            }
        }
    }

    #[test]
    fn substring_strategy_has_pea_peanut_false_positive() {
        let m = match_ingredients(&["pea"], &["peanut butter"]);
        assert_eq!(m.has, vec!["pea"]);
    }

    #[test]
    fn whole_word_strategy_rejects_partial_words() {
        let inventory = ["peanut butter", "lime juice", "chicken breast"];
        let m = match_ingredients_with(
            &["pea", "lime", "chicken"],
            &inventory,
            MatchStrategy::WholeWord,
        );
        assert_eq!(m.has, vec!["lime", "chicken"]);
        assert_eq!(m.missing, vec!["pea"]);
    }

    #[test]
    fn contains_whole_handles_punctuation_and_edges() {
        assert!(contains_whole("salt, pepper", "salt"));
        assert!(contains_whole("extra-virgin olive oil", "olive oil"));
        assert!(!contains_whole("peanut", "pea"));
        assert!(!contains_whole("anything", ""));
    }

    #[test]
    fn saved_recipes_rank_before_api_regardless_of_missing() {
        let inventory = ["rice"];
        let mut ranked = vec![
            MatchedRecipe::from_external(
                external("api-perfect", &["rice"]),
                &inventory,
                MatchStrategy::Substring,
            ),
            MatchedRecipe::from_saved(
                &saved("saved-poor", &["tofu", "kale", "miso"]),
                &inventory,
                MatchStrategy::Substring,
            ),
        ];
        rank_recipes(&mut ranked);
        assert_eq!(ranked[0].name, "saved-poor");
        assert_eq!(ranked[0].missing_ingredients.len(), 3);
        assert_eq!(ranked[1].name, "api-perfect");
        assert_eq!(ranked[1].missing_ingredients.len(), 0);
    }

    #[test]
    fn ranking_is_stable_within_ties() {
        let inventory = ["egg"];
        let mut ranked: Vec<MatchedRecipe> = ["first", "second", "third"]
            .iter()
            .map(|n| {
                MatchedRecipe::from_external(
                    external(n, &["egg", "flour"]),
                    &inventory,
                    MatchStrategy::Substring,
                )
            })
            .collect();
        ranked.insert(
            1,
            MatchedRecipe::from_external(
                external("fewest-missing", &["egg"]),
                &inventory,
                MatchStrategy::Substring,
            ),
        );
        rank_recipes(&mut ranked);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fewest-missing", "first", "second", "third"]);
    }
}
