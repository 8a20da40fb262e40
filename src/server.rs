//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/upload` | Ingest a `.txt` transcription or `.pdf` receipt |
//! | `GET` `POST` `DELETE` | `/api/inventory` | List, add, clear inventory |
//! | `POST` | `/api/inventory/parse` | Add items described in free text |
//! | `PUT` `DELETE` | `/api/inventory/{id}` | Update or remove one item |
//! | `GET` `POST` `DELETE` | `/api/shopping-list` | List, add/merge, clear |
//! | `POST` | `/api/shopping-list/from-recipe/{id}` | Add a recipe's missing ingredients |
//! | `PUT` `DELETE` | `/api/shopping-list/{id}` | Update or remove one entry |
//! | `POST` | `/api/shopping-list/{id}/toggle` | Flip `completed` |
//! | `GET` `POST` | `/api/recipes` | Search or create saved recipes |
//! | `GET` `PUT` `DELETE` | `/api/recipes/{id}` | One saved recipe |
//! | `GET` | `/api/recipes/tag/{tag}` | Saved recipes with a tag |
//! | `POST` | `/api/recipes/match` | Saved recipes using given ingredients |
//! | `POST` | `/api/recipes/{id}/adapt` | Substitutions for missing ingredients |
//! | `POST` | `/api/recipes/import` | Draft a recipe from a URL or text |
//! | `POST` | `/api/recipes/find` | Saved + external recipes ranked against the inventory |
//! | `GET` `POST` `DELETE` | `/api/meal-plans` | List, create, clear meal plans |
//! | `GET` `PUT` `DELETE` | `/api/meal-plans/{id}` | One meal plan |
//! | `GET` | `/api/meal-plans/{id}/shopping-list` | Aggregated needs not covered by the inventory |
//! | `POST` | `/api/meal-plans/{id}/shopping-list` | Add those needs to the shopping list |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "Item not found: 42", "code": "not_found" }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large`
//! (413), `upstream_error` (502), `upstream_timeout` (504), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use larder_core::models::{
    InventoryPatch, MealPlanPatch, NewInventoryItem, NewMealPlan, NewRecipe, NewShoppingItem,
    RecipePatch, ShoppingPatch,
};
use larder_core::UpstreamError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::context::AppContext;
use crate::error::ServiceError;
use crate::finder::{find_recipes, FindRequest};
use crate::importer::{import_recipe, ImportOutcome, ImportRequest};
use crate::recipes::RecipeQuery;
use crate::{inventory, meal_plans, recipes, shopping};

/// Multipart framing allowance on top of `[upload] max_bytes`.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Starts the HTTP server on `[server] bind` with JSON file stores and the
/// configured providers. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config)?;
    tracing::info!(data_dir = %config.data.dir.display(), "using data directory");
    run_server_with(ctx, &config.server.bind).await
}

/// Starts the HTTP server with an already-built context.
pub async fn run_server_with(ctx: AppContext, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Larder listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// The full route table over `ctx`.
pub fn router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = ctx.settings.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/upload", post(handle_upload))
        .route(
            "/api/inventory",
            get(handle_list_inventory)
                .post(handle_add_inventory)
                .delete(handle_clear_inventory),
        )
        .route("/api/inventory/parse", post(handle_parse_inventory))
        .route(
            "/api/inventory/{id}",
            put(handle_update_inventory).delete(handle_delete_inventory),
        )
        .route(
            "/api/shopping-list",
            get(handle_list_shopping)
                .post(handle_add_shopping)
                .delete(handle_clear_shopping),
        )
        .route(
            "/api/shopping-list/from-recipe/{id}",
            post(handle_shopping_from_recipe),
        )
        .route(
            "/api/shopping-list/{id}",
            put(handle_update_shopping).delete(handle_delete_shopping),
        )
        .route("/api/shopping-list/{id}/toggle", post(handle_toggle_shopping))
        .route("/api/recipes", get(handle_search_recipes).post(handle_create_recipe))
        .route("/api/recipes/match", post(handle_match_recipes))
        .route("/api/recipes/import", post(handle_import_recipe))
        .route("/api/recipes/find", post(handle_find_recipes))
        .route("/api/recipes/tag/{tag}", get(handle_recipes_by_tag))
        .route(
            "/api/recipes/{id}",
            get(handle_get_recipe)
                .put(handle_update_recipe)
                .delete(handle_delete_recipe),
        )
        .route("/api/recipes/{id}/adapt", post(handle_adapt_recipe))
        .route(
            "/api/meal-plans",
            get(handle_list_meal_plans)
                .post(handle_create_meal_plan)
                .delete(handle_clear_meal_plans),
        )
        .route(
            "/api/meal-plans/{id}",
            get(handle_get_meal_plan)
                .put(handle_update_meal_plan)
                .delete(handle_delete_meal_plan),
        )
        .route(
            "/api/meal-plans/{id}/shopping-list",
            get(handle_meal_plan_needs).post(handle_meal_plan_to_shopping),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => bad_request(message),
            err @ ServiceError::TooLarge { .. } => AppError {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                code: "payload_too_large",
                message: err.to_string(),
            },
            ServiceError::NotFound(message) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message,
            },
            ServiceError::Upstream(UpstreamError::Timeout) => AppError {
                status: StatusCode::GATEWAY_TIMEOUT,
                code: "upstream_timeout",
                message: "The AI service timed out. Please try again.".to_string(),
            },
            ServiceError::Upstream(e) => {
                tracing::warn!(error = %e, "upstream failure");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "upstream_error",
                    message: "An external service failed. Please try again later.".to_string(),
                }
            }
            ServiceError::Internal(e) => {
                tracing::error!(error = %format!("{:#}", e), "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}

type ApiResult = Result<Response, AppError>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| bad_request(format!("Invalid JSON body: {}", rejection.body_text())))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| bad_request(format!("Invalid query: {}", rejection.body_text())))
}

fn ok(body: Value) -> ApiResult {
    Ok(Json(body).into_response())
}

fn created(body: Value) -> ApiResult {
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /api/upload ============

async fn handle_upload(State(ctx): State<AppContext>, mut multipart: Multipart) -> ApiResult {
    let too_large = |ctx: &AppContext| ServiceError::TooLarge {
        limit: ctx.settings.max_upload_bytes,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(too_large(&ctx).into());
            }
            Err(e) => {
                return Err(bad_request(format!(
                    "Invalid multipart body: {}",
                    e.body_text()
                )));
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(too_large(&ctx).into());
            }
            Err(e) => {
                return Err(bad_request(format!(
                    "Invalid multipart body: {}",
                    e.body_text()
                )));
            }
        };
        let outcome = inventory::ingest_upload(&ctx, &filename, bytes.to_vec()).await?;
        return ok(json!({
            "success": true,
            "message": outcome.message,
            "items": outcome.items,
        }));
    }

    Err(bad_request("No file provided"))
}

// ============ /api/inventory ============

async fn handle_list_inventory(State(ctx): State<AppContext>) -> ApiResult {
    let items = inventory::list_items(&ctx).await?;
    ok(json!({ "success": true, "count": items.len(), "items": items }))
}

async fn handle_add_inventory(
    State(ctx): State<AppContext>,
    payload: Result<Json<NewInventoryItem>, JsonRejection>,
) -> ApiResult {
    let item = inventory::add_item(&ctx, json_body(payload)?).await?;
    created(json!({ "success": true, "item": item }))
}

#[derive(Deserialize)]
struct ParseRequest {
    text: String,
}

async fn handle_parse_inventory(
    State(ctx): State<AppContext>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let outcome = inventory::parse_text(&ctx, &request.text).await?;
    ok(json!({ "success": true, "message": outcome.message, "items": outcome.items }))
}

async fn handle_update_inventory(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<InventoryPatch>, JsonRejection>,
) -> ApiResult {
    let item = inventory::update_item(&ctx, &id, json_body(payload)?).await?;
    ok(json!({ "success": true, "item": item }))
}

async fn handle_delete_inventory(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    inventory::delete_item(&ctx, &id).await?;
    ok(json!({ "success": true, "message": "Item deleted" }))
}

async fn handle_clear_inventory(State(ctx): State<AppContext>) -> ApiResult {
    let removed = inventory::clear_items(&ctx).await?;
    ok(json!({
        "success": true,
        "message": format!("Removed {} items", removed),
        "removed": removed,
    }))
}

// ============ /api/shopping-list ============

#[derive(Deserialize)]
struct ShoppingListParams {
    #[serde(default)]
    all: bool,
}

async fn handle_list_shopping(
    State(ctx): State<AppContext>,
    params: Result<Query<ShoppingListParams>, QueryRejection>,
) -> ApiResult {
    let params = query_params(params)?;
    let items = shopping::list_items(&ctx, params.all).await?;
    ok(json!({ "success": true, "count": items.len(), "items": items }))
}

#[derive(Deserialize)]
struct AddShoppingRequest {
    items: Vec<NewShoppingItem>,
}

async fn handle_add_shopping(
    State(ctx): State<AppContext>,
    payload: Result<Json<AddShoppingRequest>, JsonRejection>,
) -> ApiResult {
    let items = shopping::add_items(&ctx, json_body(payload)?.items).await?;
    ok(json!({ "success": true, "count": items.len(), "items": items }))
}

async fn handle_shopping_from_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let (added, items) = shopping::add_missing_from_recipe(&ctx, &id).await?;
    ok(json!({ "success": true, "added": added, "items": items }))
}

async fn handle_update_shopping(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<ShoppingPatch>, JsonRejection>,
) -> ApiResult {
    let item = shopping::update_item(&ctx, &id, json_body(payload)?).await?;
    ok(json!({ "success": true, "item": item }))
}

async fn handle_toggle_shopping(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let item = shopping::toggle_item(&ctx, &id).await?;
    ok(json!({ "success": true, "item": item }))
}

async fn handle_delete_shopping(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    shopping::delete_item(&ctx, &id).await?;
    ok(json!({ "success": true, "message": "Item deleted" }))
}

async fn handle_clear_shopping(State(ctx): State<AppContext>) -> ApiResult {
    let removed = shopping::clear_items(&ctx).await?;
    ok(json!({
        "success": true,
        "message": format!("Removed {} items", removed),
        "removed": removed,
    }))
}

// ============ /api/recipes ============

#[derive(Deserialize)]
struct RecipeListParams {
    q: Option<String>,
    /// Comma-separated.
    tags: Option<String>,
    /// Comma-separated.
    ingredients: Option<String>,
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn handle_search_recipes(
    State(ctx): State<AppContext>,
    params: Result<Query<RecipeListParams>, QueryRejection>,
) -> ApiResult {
    let params = query_params(params)?;
    let query = RecipeQuery {
        q: params.q,
        tags: split_list(params.tags),
        ingredients: split_list(params.ingredients),
    };
    let found = recipes::search_recipes(&ctx, &query).await?;
    ok(json!({ "success": true, "count": found.len(), "recipes": found }))
}

async fn handle_create_recipe(
    State(ctx): State<AppContext>,
    payload: Result<Json<NewRecipe>, JsonRejection>,
) -> ApiResult {
    let recipe = recipes::create_recipe(&ctx, json_body(payload)?).await?;
    created(json!({ "success": true, "recipe": recipe }))
}

async fn handle_get_recipe(State(ctx): State<AppContext>, Path(id): Path<String>) -> ApiResult {
    let recipe = recipes::get_recipe(&ctx, &id).await?;
    ok(json!({ "success": true, "recipe": recipe }))
}

async fn handle_update_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<RecipePatch>, JsonRejection>,
) -> ApiResult {
    let recipe = recipes::update_recipe(&ctx, &id, json_body(payload)?).await?;
    ok(json!({ "success": true, "recipe": recipe }))
}

async fn handle_delete_recipe(State(ctx): State<AppContext>, Path(id): Path<String>) -> ApiResult {
    recipes::delete_recipe(&ctx, &id).await?;
    ok(json!({ "success": true, "message": "Recipe deleted" }))
}

async fn handle_recipes_by_tag(
    State(ctx): State<AppContext>,
    Path(tag): Path<String>,
) -> ApiResult {
    let found = recipes::recipes_by_tag(&ctx, &tag).await?;
    ok(json!({ "success": true, "count": found.len(), "recipes": found }))
}

#[derive(Deserialize)]
struct MatchRequest {
    ingredients: Vec<String>,
}

async fn handle_match_recipes(
    State(ctx): State<AppContext>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let matched = recipes::match_recipes(&ctx, &request.ingredients).await?;
    ok(json!({ "success": true, "count": matched.len(), "recipes": matched }))
}

async fn handle_adapt_recipe(State(ctx): State<AppContext>, Path(id): Path<String>) -> ApiResult {
    let adaptation = recipes::adapt_recipe(&ctx, &id).await?;
    ok(json!({
        "success": true,
        "recipe_id": adaptation.recipe_id,
        "match_percentage": adaptation.match_percentage,
        "has_ingredients": adaptation.has_ingredients,
        "missing_ingredients": adaptation.missing_ingredients,
        "substitutions": adaptation.substitutions,
    }))
}

async fn handle_import_recipe(
    State(ctx): State<AppContext>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> ApiResult {
    match import_recipe(&ctx, json_body(payload)?).await? {
        ImportOutcome::Imported(recipe) => ok(json!({ "success": true, "recipe": recipe })),
        ImportOutcome::NeedsManualEntry { recipe, message } => ok(json!({
            "success": false,
            "needs_manual_entry": true,
            "recipe": recipe,
            "message": message,
        })),
    }
}

async fn handle_find_recipes(
    State(ctx): State<AppContext>,
    payload: Result<Json<FindRequest>, JsonRejection>,
) -> ApiResult {
    let result = find_recipes(&ctx, json_body(payload)?).await?;
    let mut body = json!({
        "success": true,
        "count": result.recipes.len(),
        "recipes": result.recipes,
    });
    if let Some(reason) = result.external_error {
        body["external_error"] = Value::String(reason);
    }
    ok(body)
}

// ============ /api/meal-plans ============

async fn handle_list_meal_plans(State(ctx): State<AppContext>) -> ApiResult {
    let plans = meal_plans::list_plans(&ctx).await?;
    ok(json!({ "success": true, "count": plans.len(), "meal_plans": plans }))
}

async fn handle_create_meal_plan(
    State(ctx): State<AppContext>,
    payload: Result<Json<NewMealPlan>, JsonRejection>,
) -> ApiResult {
    let plan = meal_plans::create_plan(&ctx, json_body(payload)?).await?;
    created(json!({ "success": true, "meal_plan": plan }))
}

async fn handle_clear_meal_plans(State(ctx): State<AppContext>) -> ApiResult {
    let removed = meal_plans::clear_plans(&ctx).await?;
    ok(json!({
        "success": true,
        "message": format!("Removed {} meal plans", removed),
        "removed": removed,
    }))
}

async fn handle_get_meal_plan(State(ctx): State<AppContext>, Path(id): Path<String>) -> ApiResult {
    let plan = meal_plans::get_plan(&ctx, &id).await?;
    ok(json!({ "success": true, "meal_plan": plan }))
}

async fn handle_update_meal_plan(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<MealPlanPatch>, JsonRejection>,
) -> ApiResult {
    let plan = meal_plans::update_plan(&ctx, &id, json_body(payload)?).await?;
    ok(json!({ "success": true, "meal_plan": plan }))
}

async fn handle_delete_meal_plan(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    meal_plans::delete_plan(&ctx, &id).await?;
    ok(json!({ "success": true, "message": "Meal plan deleted" }))
}

async fn handle_meal_plan_needs(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let list = meal_plans::shopping_list(&ctx, &id).await?;
    ok(json!({
        "success": true,
        "aggregated": list.aggregated,
        "needed": list.needed,
        "ingredient_names": list.ingredient_names,
        "csv": list.csv,
        "total_items": list.total_items,
    }))
}

async fn handle_meal_plan_to_shopping(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let (list, items) = meal_plans::add_to_shopping_list(&ctx, &id).await?;
    ok(json!({
        "success": true,
        "added": list.ingredient_names,
        "count": items.len(),
        "items": items,
    }))
}
