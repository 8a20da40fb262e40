//! Shopping list operations.
//!
//! Adding an item whose name (case-insensitive) is already on the list
//! increases that entry's quantity and marks it active again instead of
//! creating a duplicate.

use chrono::Utc;
use larder_core::matching::match_ingredients_with;
use larder_core::models::{NewShoppingItem, ShoppingItem, ShoppingPatch};
use larder_core::store::{new_id, Record};

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

/// Entries on the list. Without `include_completed`, only active entries,
/// newest first.
pub async fn list_items(
    ctx: &AppContext,
    include_completed: bool,
) -> ServiceResult<Vec<ShoppingItem>> {
    let items = ctx.shopping.list_all().await?;
    if include_completed {
        return Ok(items);
    }
    let mut active: Vec<ShoppingItem> = items.into_iter().filter(|i| !i.completed).collect();
    active.sort_by(|a, b| b.added_date.cmp(&a.added_date));
    Ok(active)
}

/// Add or merge entries in one write. Returns the created or merged
/// entries, one per distinct non-blank input name, in input order.
pub async fn add_items(
    ctx: &AppContext,
    drafts: Vec<NewShoppingItem>,
) -> ServiceResult<Vec<ShoppingItem>> {
    for draft in &drafts {
        if !draft.quantity.is_finite() || draft.quantity <= 0.0 {
            return Err(ServiceError::validation(format!(
                "quantity for '{}' must be a positive number",
                draft.name.trim()
            )));
        }
    }

    let mut items = ctx.shopping.load().await?;
    let now = Utc::now();
    let mut touched: Vec<String> = Vec::new();

    for draft in drafts {
        let key = draft.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let id = match items.iter_mut().find(|i| i.name.to_lowercase() == key) {
            Some(existing) => {
                existing.quantity += draft.quantity;
                existing.completed = false;
                existing.id.clone()
            }
            None => {
                let mut id = new_id();
                while items.iter().any(|i| i.id == id) {
                    id = new_id();
                }
                items.push(ShoppingItem::create(draft, id.clone(), now));
                id
            }
        };
        if !touched.contains(&id) {
            touched.push(id);
        }
    }

    if touched.is_empty() {
        return Err(ServiceError::validation("No items to add"));
    }
    ctx.shopping.save(&items).await?;
    tracing::info!(count = touched.len(), "shopping list updated");

    Ok(touched
        .iter()
        .filter_map(|id| items.iter().find(|i| &i.id == id).cloned())
        .collect())
}

/// Add the ingredients of a saved recipe that the inventory lacks.
/// Returns the names that were missing and the resulting list entries.
pub async fn add_missing_from_recipe(
    ctx: &AppContext,
    recipe_id: &str,
) -> ServiceResult<(Vec<String>, Vec<ShoppingItem>)> {
    let recipe = ctx
        .recipes
        .get(recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;
    let inventory = ctx.inventory_names().await?;
    let matched =
        match_ingredients_with(&recipe.ingredient_names(), &inventory, ctx.settings.strategy);

    if matched.missing.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let drafts = matched
        .missing
        .iter()
        .map(|name| {
            let line = recipe
                .ingredients
                .iter()
                .find(|i| i.name.trim().eq_ignore_ascii_case(name));
            NewShoppingItem {
                name: name.clone(),
                quantity: line.map(|i| i.quantity).filter(|q| *q > 0.0).unwrap_or(1.0),
                unit: line.map(|i| i.unit.clone()).unwrap_or_default(),
                notes: format!("For {}", recipe.name),
            }
        })
        .collect();
    let items = add_items(ctx, drafts).await?;
    Ok((matched.missing, items))
}

pub async fn update_item(
    ctx: &AppContext,
    id: &str,
    patch: ShoppingPatch,
) -> ServiceResult<ShoppingItem> {
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        return Err(ServiceError::validation("Item name must not be empty"));
    }
    if matches!(patch.quantity, Some(q) if !q.is_finite() || q <= 0.0) {
        return Err(ServiceError::validation("quantity must be a positive number"));
    }
    ctx.shopping
        .update(id, patch)
        .await?
        .ok_or_else(|| ServiceError::not_found("Item", id))
}

pub async fn toggle_item(ctx: &AppContext, id: &str) -> ServiceResult<ShoppingItem> {
    let current = ctx
        .shopping
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Item", id))?;
    let patch = ShoppingPatch {
        completed: Some(!current.completed),
        ..Default::default()
    };
    ctx.shopping
        .update(id, patch)
        .await?
        .ok_or_else(|| ServiceError::not_found("Item", id))
}

pub async fn delete_item(ctx: &AppContext, id: &str) -> ServiceResult<()> {
    if !ctx.shopping.delete(id).await? {
        return Err(ServiceError::not_found("Item", id));
    }
    Ok(())
}

pub async fn clear_items(ctx: &AppContext) -> ServiceResult<usize> {
    Ok(ctx.shopping.clear().await?)
}
