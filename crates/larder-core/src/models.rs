//! Core data models stored and exchanged by Larder.
//!
//! Each stored record type comes with a *draft* (the fields a caller may
//! supply when creating it) and a *patch* (every field optional, for partial
//! updates). Identifiers and timestamps are never part of a draft; the store
//! assigns them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Food category. Serialized lowercase; parsing is lenient (see
/// [`Category::from_label`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Dairy,
    Produce,
    Meat,
    Pantry,
    Frozen,
    Beverages,
    Bakery,
    #[default]
    Other,
}

impl Category {
    /// Map a free-text label onto a category. Unknown labels become
    /// [`Category::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "dairy" | "eggs" | "cheese" => Category::Dairy,
            "produce" | "vegetable" | "vegetables" | "fruit" | "fruits" | "herbs" => {
                Category::Produce
            }
            "meat" | "poultry" | "fish" | "seafood" => Category::Meat,
            "pantry" | "dry goods" | "canned" | "spices" | "condiments" => Category::Pantry,
            "frozen" => Category::Frozen,
            "beverages" | "beverage" | "drinks" | "drink" => Category::Beverages,
            "bakery" | "bread" => Category::Bakery,
            _ => Category::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dairy => "dairy",
            Category::Produce => "produce",
            Category::Meat => "meat",
            Category::Pantry => "pantry",
            Category::Frozen => "frozen",
            Category::Beverages => "beverages",
            Category::Bakery => "bakery",
            Category::Other => "other",
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an inventory item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    #[default]
    Manual,
    Receipt,
    Transcription,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Manual => "manual",
            ItemSource::Receipt => "receipt",
            ItemSource::Transcription => "transcription",
        }
    }
}

fn default_quantity() -> f64 {
    1.0
}

fn default_unit() -> String {
    "pieces".to_string()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

// ============ Inventory ============

/// A food item currently on hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: Category,
    pub added_date: DateTime<Utc>,
    pub source: ItemSource,
    #[serde(default)]
    pub notes: String,
}

/// Caller-supplied fields for a new inventory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub source: ItemSource,
    #[serde(default)]
    pub notes: String,
}

impl NewInventoryItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: default_quantity(),
            unit: default_unit(),
            category: Category::Other,
            source: ItemSource::Manual,
            notes: String::new(),
        }
    }
}

/// Partial update for an inventory item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<Category>,
    pub notes: Option<String>,
}

impl Record for InventoryItem {
    type Draft = NewInventoryItem;
    type Patch = InventoryPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(draft: NewInventoryItem, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: normalize(&draft.name),
            quantity: draft.quantity,
            unit: normalize(&draft.unit),
            category: draft.category,
            added_date: now,
            source: draft.source,
            notes: draft.notes,
        }
    }

    fn apply(&mut self, patch: InventoryPatch) {
        if let Some(name) = patch.name {
            self.name = normalize(&name);
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = normalize(&unit);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

// ============ Shopping list ============

/// An entry on the shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    pub added_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShoppingItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoppingPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl Record for ShoppingItem {
    type Draft = NewShoppingItem;
    type Patch = ShoppingPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(draft: NewShoppingItem, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            quantity: draft.quantity,
            unit: draft.unit.trim().to_string(),
            notes: draft.notes,
            completed: false,
            added_date: now,
        }
    }

    fn apply(&mut self, patch: ShoppingPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

// ============ Recipes ============

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

/// Where a saved recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    #[default]
    Manual,
    #[serde(alias = "website")]
    Url,
    Youtube,
}

/// A recipe in the user's personal library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: RecipeSource,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn ingredient_names(&self) -> Vec<&str> {
        self.ingredients.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}

/// Caller-supplied fields for a new recipe. Also used as the draft
/// returned by the recipe importer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: RecipeSource,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source: Option<RecipeSource>,
    pub source_url: Option<String>,
    pub notes: Option<String>,
}

/// Trim tags, drop blanks, and remove case-insensitive duplicates keeping
/// the first spelling.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

impl Record for Recipe {
    type Draft = NewRecipe;
    type Patch = RecipePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(draft: NewRecipe, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            tags: normalize_tags(draft.tags),
            source: draft.source,
            source_url: draft.source_url,
            notes: draft.notes,
            created_at: now,
        }
    }

    fn apply(&mut self, patch: RecipePatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(ingredients) = patch.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(instructions) = patch.instructions {
            self.instructions = instructions;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(source_url) = patch.source_url {
            self.source_url = Some(source_url);
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

// ============ Meal plans ============

/// One planned meal: a saved recipe on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub date: NaiveDate,
    pub recipe_id: String,
}

/// Saved recipes scheduled over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Free-text intent, e.g. "quick weeknight dinners".
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub meals: Vec<PlannedMeal>,
    pub created_at: DateTime<Utc>,
}

impl MealPlan {
    /// Distinct recipe ids in meal order.
    pub fn recipe_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for meal in &self.meals {
            if !ids.contains(&meal.recipe_id.as_str()) {
                ids.push(&meal.recipe_id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMealPlan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub meals: Vec<PlannedMeal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealPlanPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub criteria: Option<String>,
    pub meals: Option<Vec<PlannedMeal>>,
}

fn sort_meals(meals: &mut [PlannedMeal]) {
    meals.sort_by_key(|m| m.date);
}

impl Record for MealPlan {
    type Draft = NewMealPlan;
    type Patch = MealPlanPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(draft: NewMealPlan, id: String, now: DateTime<Utc>) -> Self {
        let mut meals = draft.meals;
        sort_meals(&mut meals);
        Self {
            id,
            start_date: draft.start_date,
            end_date: draft.end_date,
            criteria: draft.criteria.trim().to_string(),
            meals,
            created_at: now,
        }
    }

    fn apply(&mut self, patch: MealPlanPatch) {
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(criteria) = patch.criteria {
            self.criteria = criteria.trim().to_string();
        }
        if let Some(mut meals) = patch.meals {
            sort_meals(&mut meals);
            self.meals = meals;
        }
    }
}

// ============ Capability payloads ============

/// A food item as returned by the extraction collaborator, after
/// lenient parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: Category,
}

impl ExtractedItem {
    pub fn into_draft(self, source: ItemSource) -> NewInventoryItem {
        NewInventoryItem {
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            category: self.category,
            source,
            notes: String::new(),
        }
    }
}

/// A suggested replacement for a missing recipe ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub missing: String,
    pub substitute: String,
    #[serde(default)]
    pub note: String,
}

/// A recipe returned live by the external recipe-search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: String,
    pub servings: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_lenient() {
        assert_eq!(Category::from_label(" Dairy "), Category::Dairy);
        assert_eq!(Category::from_label("vegetables"), Category::Produce);
        assert_eq!(Category::from_label("Drinks"), Category::Beverages);
        assert_eq!(Category::from_label("snacks"), Category::Other);

        let parsed: Category = serde_json::from_str("\"FROZEN\"").unwrap();
        assert_eq!(parsed, Category::Frozen);
        assert_eq!(serde_json::to_string(&Category::Bakery).unwrap(), "\"bakery\"");
    }

    #[test]
    fn inventory_draft_defaults_and_ignores_id() {
        let draft: NewInventoryItem =
            serde_json::from_str(r#"{"name": "Milk", "id": "caller-id", "added_date": "x"}"#)
                .unwrap();
        assert_eq!(draft.quantity, 1.0);
        assert_eq!(draft.unit, "pieces");
        assert_eq!(draft.category, Category::Other);

        let now = Utc::now();
        let item = InventoryItem::create(draft, "generated".into(), now);
        assert_eq!(item.id, "generated");
        assert_eq!(item.name, "milk");
        assert_eq!(item.added_date, now);
    }

    #[test]
    fn inventory_patch_changes_only_supplied_fields() {
        let mut item = InventoryItem::create(
            NewInventoryItem {
                name: "Rice".into(),
                quantity: 2.0,
                unit: "KG".into(),
                category: Category::Pantry,
                source: ItemSource::Receipt,
                notes: "basmati".into(),
            },
            "a".into(),
            Utc::now(),
        );
        let before = item.clone();
        item.apply(InventoryPatch {
            quantity: Some(5.0),
            ..Default::default()
        });
        assert_eq!(item.quantity, 5.0);
        assert_eq!(
            InventoryItem {
                quantity: before.quantity,
                ..item
            },
            before
        );
    }

    #[test]
    fn tags_are_deduplicated_case_insensitively() {
        let tags = normalize_tags(vec![
            "Vegan".into(),
            " quick ".into(),
            "vegan".into(),
            "".into(),
        ]);
        assert_eq!(tags, vec!["Vegan".to_string(), "quick".to_string()]);
    }

    #[test]
    fn recipe_source_accepts_website_alias() {
        let source: RecipeSource = serde_json::from_str("\"website\"").unwrap();
        assert_eq!(source, RecipeSource::Url);
    }

    #[test]
    fn meal_plan_keeps_meals_in_date_order() {
        let plan: NewMealPlan = serde_json::from_str(
            r#"{
                "start_date": "2026-03-02",
                "end_date": "2026-03-06",
                "meals": [
                    {"date": "2026-03-04", "recipe_id": "b"},
                    {"date": "2026-03-02", "recipe_id": "a"},
                    {"date": "2026-03-05", "recipe_id": "a"}
                ]
            }"#,
        )
        .unwrap();
        let plan = MealPlan::create(plan, "p1".into(), Utc::now());
        assert_eq!(plan.criteria, "");
        assert_eq!(plan.meals[0].recipe_id, "a");
        assert_eq!(plan.recipe_ids(), vec!["a", "b"]);

        let mut plan = plan;
        plan.apply(MealPlanPatch {
            criteria: Some(" vegetarian ".into()),
            ..Default::default()
        });
        assert_eq!(plan.criteria, "vegetarian");
        assert_eq!(plan.meals.len(), 3);
    }
}
