//! Shared application state: stores, external capabilities, and limits.
//!
//! Every service function takes an [`AppContext`]. The server clones it
//! into axum state; the CLI builds one per command.

use anyhow::Result;
use larder_core::matching::MatchStrategy;
use larder_core::models::{InventoryItem, MealPlan, Recipe, ShoppingItem};
use larder_core::providers::{Extractor, RecipeSearch};
use larder_core::store::{MemoryStore, Store};
use larder_core::UpstreamError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::file_store::JsonFileStore;
use crate::openai::create_extractor;
use crate::recipe_api::create_recipe_search;

/// Limits and tunables read from the config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_upload_bytes: usize,
    pub ai_timeout: Duration,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
    pub strategy: MatchStrategy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            ai_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
            strategy: MatchStrategy::Substring,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.upload.max_bytes,
            ai_timeout: Duration::from_secs(config.ai.timeout_secs),
            search_timeout: Duration::from_secs(config.recipe_search.timeout_secs),
            strategy: config.matching.strategy,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub inventory: Arc<dyn Store<InventoryItem>>,
    pub shopping: Arc<dyn Store<ShoppingItem>>,
    pub recipes: Arc<dyn Store<Recipe>>,
    pub meal_plans: Arc<dyn Store<MealPlan>>,
    pub extractor: Arc<dyn Extractor>,
    pub recipe_search: Arc<dyn RecipeSearch>,
    /// Client for fetching recipe pages during import.
    pub http: reqwest::Client,
    pub settings: Settings,
}

impl AppContext {
    /// JSON file stores under `[data] dir` plus the configured providers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = Settings::from_config(config);
        Ok(Self {
            inventory: Arc::new(JsonFileStore::<InventoryItem>::new(
                config.data.inventory_path(),
            )),
            shopping: Arc::new(JsonFileStore::<ShoppingItem>::new(
                config.data.shopping_list_path(),
            )),
            recipes: Arc::new(JsonFileStore::<Recipe>::new(config.data.recipes_path())),
            meal_plans: Arc::new(JsonFileStore::<MealPlan>::new(
                config.data.meal_plans_path(),
            )),
            extractor: create_extractor(&config.ai)?,
            recipe_search: create_recipe_search(&config.recipe_search)?,
            http: page_client(settings.fetch_timeout)?,
            settings,
        })
    }

    /// Empty in-memory stores with the given capabilities.
    pub fn in_memory(
        extractor: Arc<dyn Extractor>,
        recipe_search: Arc<dyn RecipeSearch>,
        settings: Settings,
    ) -> Result<Self> {
        Ok(Self {
            inventory: Arc::new(MemoryStore::<InventoryItem>::new()),
            shopping: Arc::new(MemoryStore::<ShoppingItem>::new()),
            recipes: Arc::new(MemoryStore::<Recipe>::new()),
            meal_plans: Arc::new(MemoryStore::<MealPlan>::new()),
            extractor,
            recipe_search,
            http: page_client(settings.fetch_timeout)?,
            settings,
        })
    }

    /// Current inventory item names, in stored order.
    pub async fn inventory_names(&self) -> Result<Vec<String>> {
        Ok(self
            .inventory
            .list_all()
            .await?
            .into_iter()
            .map(|item| item.name)
            .collect())
    }

    /// Run an extraction call under `[ai] timeout_secs`.
    pub async fn with_ai_deadline<T, F>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        with_deadline(self.settings.ai_timeout, call).await
    }

    /// Run a recipe-search call under `[recipe_search] timeout_secs`.
    pub async fn with_search_deadline<T, F>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        with_deadline(self.settings.search_timeout, call).await
    }
}

async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs_f64(), "upstream call timed out");
            Err(UpstreamError::Timeout)
        }
    }
}

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

fn page_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_maps_expiry_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, UpstreamError>(1)
        };
        let result = with_deadline(Duration::from_millis(10), slow).await;
        assert_eq!(result, Err(UpstreamError::Timeout));

        let fast = async { Ok::<_, UpstreamError>(2) };
        assert_eq!(with_deadline(Duration::from_secs(1), fast).await, Ok(2));
    }
}
