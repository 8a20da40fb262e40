//! Meal plans: a date range with saved recipes assigned to days, and the
//! shopping needs those recipes add up to.

use larder_core::models::{
    MealPlan, MealPlanPatch, NewMealPlan, NewShoppingItem, PlannedMeal, Recipe, ShoppingItem,
};
use larder_core::planning::{plan_shopping_list, PlanShoppingList};
use larder_core::store::Record;

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};
use crate::shopping;

async fn check_plan(
    ctx: &AppContext,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    meals: &[PlannedMeal],
) -> ServiceResult<()> {
    if start > end {
        return Err(ServiceError::validation("start_date must not be after end_date"));
    }
    if meals.is_empty() {
        return Ok(());
    }
    let recipes = ctx.recipes.list_all().await?;
    for meal in meals {
        if meal.date < start || meal.date > end {
            return Err(ServiceError::validation(format!(
                "Meal date {} is outside {}..{}",
                meal.date, start, end
            )));
        }
        if !recipes.iter().any(|r| r.id == meal.recipe_id) {
            return Err(ServiceError::validation(format!("Unknown recipe: {}", meal.recipe_id)));
        }
    }
    Ok(())
}

/// All plans, most recent start date first.
pub async fn list_plans(ctx: &AppContext) -> ServiceResult<Vec<MealPlan>> {
    let mut plans = ctx.meal_plans.list_all().await?;
    plans.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(plans)
}

pub async fn create_plan(ctx: &AppContext, draft: NewMealPlan) -> ServiceResult<MealPlan> {
    check_plan(ctx, draft.start_date, draft.end_date, &draft.meals).await?;
    let plan = ctx.meal_plans.add(draft).await?;
    tracing::info!(
        id = %plan.id,
        start = %plan.start_date,
        end = %plan.end_date,
        meals = plan.meals.len(),
        "meal plan saved"
    );
    Ok(plan)
}

pub async fn get_plan(ctx: &AppContext, id: &str) -> ServiceResult<MealPlan> {
    ctx.meal_plans
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Meal plan", id))
}

/// Apply `patch` after checking the merged plan is still consistent.
pub async fn update_plan(
    ctx: &AppContext,
    id: &str,
    patch: MealPlanPatch,
) -> ServiceResult<MealPlan> {
    let mut merged = get_plan(ctx, id).await?;
    merged.apply(patch.clone());
    check_plan(ctx, merged.start_date, merged.end_date, &merged.meals).await?;
    ctx.meal_plans
        .update(id, patch)
        .await?
        .ok_or_else(|| ServiceError::not_found("Meal plan", id))
}

pub async fn delete_plan(ctx: &AppContext, id: &str) -> ServiceResult<()> {
    if !ctx.meal_plans.delete(id).await? {
        return Err(ServiceError::not_found("Meal plan", id));
    }
    tracing::info!(id, "meal plan deleted");
    Ok(())
}

pub async fn clear_plans(ctx: &AppContext) -> ServiceResult<usize> {
    Ok(ctx.meal_plans.clear().await?)
}

/// Ingredients of every planned meal summed by name and unit, minus what
/// the inventory covers. Recipes deleted since planning are skipped.
pub async fn shopping_list(ctx: &AppContext, id: &str) -> ServiceResult<PlanShoppingList> {
    let plan = get_plan(ctx, id).await?;
    let saved = ctx.recipes.list_all().await?;

    for recipe_id in plan.recipe_ids() {
        if !saved.iter().any(|r| r.id == recipe_id) {
            tracing::warn!(plan = %plan.id, recipe_id, "planned recipe no longer exists");
        }
    }
    // A recipe planned on several days counts once per meal.
    let recipes: Vec<&Recipe> = plan
        .meals
        .iter()
        .filter_map(|meal| saved.iter().find(|r| r.id == meal.recipe_id))
        .collect();

    let inventory = ctx.inventory_names().await?;
    Ok(plan_shopping_list(recipes, &inventory, ctx.settings.strategy))
}

/// Put the plan's needed ingredients on the shopping list. Returns the
/// computed list and the resulting entries; nothing needed means no write.
pub async fn add_to_shopping_list(
    ctx: &AppContext,
    id: &str,
) -> ServiceResult<(PlanShoppingList, Vec<ShoppingItem>)> {
    let list = shopping_list(ctx, id).await?;
    if list.needed.is_empty() {
        return Ok((list, Vec::new()));
    }
    let plan = get_plan(ctx, id).await?;
    let note = format!("For meal plan {}..{}", plan.start_date, plan.end_date);
    let drafts = list
        .needed
        .iter()
        .map(|n| NewShoppingItem {
            name: n.name.clone(),
            quantity: n.quantity,
            unit: n.unit.clone(),
            notes: note.clone(),
        })
        .collect();
    let items = shopping::add_items(ctx, drafts).await?;
    Ok((list, items))
}
