//! Shopping needs for a meal plan.
//!
//! Ingredients of every planned recipe are summed by name and unit, then
//! anything the inventory already covers is dropped using the same
//! containment rule as recipe matching.

use serde::Serialize;

use crate::matching::{names_match, MatchStrategy};
use crate::models::Recipe;

/// One ingredient summed across recipes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Shopping view of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanShoppingList {
    /// Every ingredient of the planned recipes, first-seen order.
    pub aggregated: Vec<AggregatedIngredient>,
    /// The subset of `aggregated` the inventory does not cover.
    pub needed: Vec<AggregatedIngredient>,
    /// Sorted, distinct names from `needed`.
    pub ingredient_names: Vec<String>,
    /// `ingredient_names` joined with `", "`.
    pub csv: String,
    pub total_items: usize,
}

/// Sum ingredient quantities across `recipes`. Names and units are compared
/// case-insensitively after trimming; the same name with different units
/// stays as separate entries. Blank names are skipped and non-positive
/// quantities count as 1.
pub fn aggregate_ingredients<'a, I>(recipes: I) -> Vec<AggregatedIngredient>
where
    I: IntoIterator<Item = &'a Recipe>,
{
    let mut out: Vec<AggregatedIngredient> = Vec::new();
    for recipe in recipes {
        for ingredient in &recipe.ingredients {
            let name = ingredient.name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            let unit = ingredient.unit.trim().to_lowercase();
            let quantity = if ingredient.quantity.is_finite() && ingredient.quantity > 0.0 {
                ingredient.quantity
            } else {
                1.0
            };
            match out.iter_mut().find(|a| a.name == name && a.unit == unit) {
                Some(existing) => existing.quantity += quantity,
                None => out.push(AggregatedIngredient {
                    name,
                    quantity,
                    unit,
                }),
            }
        }
    }
    out
}

/// Aggregate `recipes` and drop what `inventory_names` already covers.
pub fn plan_shopping_list<'a, I, T>(
    recipes: I,
    inventory_names: &[T],
    strategy: MatchStrategy,
) -> PlanShoppingList
where
    I: IntoIterator<Item = &'a Recipe>,
    T: AsRef<str>,
{
    let inventory: Vec<String> = inventory_names
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();

    let aggregated = aggregate_ingredients(recipes);
    let needed: Vec<AggregatedIngredient> = aggregated
        .iter()
        .filter(|a| !inventory.iter().any(|inv| names_match(&a.name, inv, strategy)))
        .cloned()
        .collect();

    let mut ingredient_names: Vec<String> = needed.iter().map(|a| a.name.clone()).collect();
    ingredient_names.sort();
    ingredient_names.dedup();

    PlanShoppingList {
        csv: ingredient_names.join(", "),
        total_items: ingredient_names.len(),
        aggregated,
        needed,
        ingredient_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;

    fn recipe(ingredients: &[(&str, f64, &str)]) -> Recipe {
        Recipe {
            id: "r".into(),
            name: "r".into(),
            ingredients: ingredients
                .iter()
                .map(|(name, quantity, unit)| Ingredient {
                    name: name.to_string(),
                    quantity: *quantity,
                    unit: unit.to_string(),
                })
                .collect(),
            instructions: String::new(),
            tags: Vec::new(),
            source: Default::default(),
            source_url: None,
            notes: String::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn sums_by_name_and_unit() {
        let a = recipe(&[("Chicken", 1.0, "lbs"), ("tomato", 2.0, "pieces")]);
        let b = recipe(&[
            ("chicken ", 2.0, "LBS"),
            ("Tomato", 1.0, "cans"),
            ("", 1.0, ""),
        ]);
        let aggregated = aggregate_ingredients([&a, &b]);
        assert_eq!(
            aggregated,
            vec![
                AggregatedIngredient {
                    name: "chicken".into(),
                    quantity: 3.0,
                    unit: "lbs".into()
                },
                AggregatedIngredient {
                    name: "tomato".into(),
                    quantity: 2.0,
                    unit: "pieces".into()
                },
                AggregatedIngredient {
                    name: "tomato".into(),
                    quantity: 1.0,
                    unit: "cans".into()
                },
            ]
        );
    }

    #[test]
    fn zero_quantity_counts_as_one() {
        let a = recipe(&[("salt", 0.0, "")]);
        assert_eq!(aggregate_ingredients([&a])[0].quantity, 1.0);
    }

    #[test]
    fn inventory_covered_items_are_not_needed() {
        let a = recipe(&[
            ("chicken", 1.0, "lbs"),
            ("rice", 1.0, "cups"),
            ("basil", 1.0, ""),
        ]);
        let b = recipe(&[("rice", 2.0, "cups"), ("peas", 1.0, "cups")]);
        let list = plan_shopping_list(
            [&a, &b],
            &["Chicken breast", "peanut butter"],
            MatchStrategy::WholeWord,
        );
        assert_eq!(list.aggregated.len(), 4);
        assert_eq!(list.ingredient_names, vec!["basil", "peas", "rice"]);
        assert_eq!(list.csv, "basil, peas, rice");
        assert_eq!(list.total_items, 3);
        let rice = list.needed.iter().find(|n| n.name == "rice").unwrap();
        assert_eq!(rice.quantity, 3.0);
    }

    #[test]
    fn empty_plan_has_empty_csv() {
        let list = plan_shopping_list(
            std::iter::empty::<&Recipe>(),
            &["milk"],
            MatchStrategy::Substring,
        );
        assert!(list.aggregated.is_empty());
        assert_eq!(list.csv, "");
        assert_eq!(list.total_items, 0);
    }
}
