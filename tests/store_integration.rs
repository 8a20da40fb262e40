//! Integration tests for the JSON file store and a file-backed context.

use larder::config::parse_config;
use larder::context::AppContext;
use larder::file_store::JsonFileStore;
use larder::{inventory, recipes, shopping};
use larder_core::models::{
    Category, InventoryItem, InventoryPatch, MealPlan, NewInventoryItem, NewMealPlan, NewRecipe,
    NewShoppingItem, Recipe,
};
use larder_core::store::Store;
use tempfile::TempDir;

fn milk() -> NewInventoryItem {
    NewInventoryItem {
        quantity: 2.0,
        unit: "liters".to_string(),
        category: Category::Dairy,
        ..NewInventoryItem::named("Milk")
    }
}

#[tokio::test]
async fn missing_file_reads_empty() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileStore::<InventoryItem>::new(tmp.path().join("inventory.json"));
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn records_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("inventory.json");

    let store = JsonFileStore::<InventoryItem>::new(&path);
    let created = store.add(milk()).await.unwrap();
    store.add(NewInventoryItem::named("Eggs")).await.unwrap();
    assert!(path.exists(), "parent directory should be created");

    let reopened = JsonFileStore::<InventoryItem>::new(&path);
    let items = reopened.list_all().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], created);
    assert_eq!(items[1].name, "eggs");

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[0]["category"], "dairy");
    assert_eq!(on_disk[0]["source"], "manual");
}

#[tokio::test]
async fn update_and_delete_persist() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("inventory.json");
    let store = JsonFileStore::<InventoryItem>::new(&path);
    let created = store.add(milk()).await.unwrap();

    let patch = InventoryPatch {
        quantity: Some(0.5),
        ..Default::default()
    };
    let updated = store.update(&created.id, patch).await.unwrap().unwrap();
    assert_eq!(updated.quantity, 0.5);
    assert_eq!(updated.added_date, created.added_date);

    let reopened = JsonFileStore::<InventoryItem>::new(&path);
    assert_eq!(reopened.get(&created.id).await.unwrap().unwrap().quantity, 0.5);

    assert!(reopened.delete(&created.id).await.unwrap());
    assert!(!reopened.delete(&created.id).await.unwrap());
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_file_is_an_error_and_left_alone() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("inventory.json");
    std::fs::write(&path, "[{\"name\": \"Milk\",").unwrap();

    let store = JsonFileStore::<InventoryItem>::new(&path);
    assert!(store.list_all().await.is_err());
    assert!(store.add(milk()).await.is_err());

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[{\"name\": \"Milk\","
    );
}

#[tokio::test]
async fn blank_file_reads_empty_and_no_tmp_is_left() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("inventory.json");
    std::fs::write(&path, "  \n").unwrap();

    let store = JsonFileStore::<InventoryItem>::new(&path);
    assert!(store.list_all().await.unwrap().is_empty());
    store.add(milk()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["inventory.json"]);
}

#[tokio::test]
async fn concurrent_saves_leave_one_valid_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("inventory.json");
    let store = std::sync::Arc::new(JsonFileStore::<InventoryItem>::new(&path));
    let seed = store.add(milk()).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..16 {
        let store = store.clone();
        let mut item = seed.clone();
        item.quantity = n as f64 + 1.0;
        tasks.push(tokio::spawn(async move {
            let records = vec![item; n + 1];
            store.save(&records).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let saved: Vec<InventoryItem> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.len() as f64, saved[0].quantity);

    let names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["inventory.json"]);
}

#[tokio::test]
async fn meal_plans_persist_with_dates() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("meal_plans.json");
    let store = JsonFileStore::<MealPlan>::new(&path);
    let draft: NewMealPlan = serde_json::from_value(serde_json::json!({
        "start_date": "2026-03-02",
        "end_date": "2026-03-04",
        "meals": [
            {"date": "2026-03-04", "recipe_id": "b"},
            {"date": "2026-03-02", "recipe_id": "a"}
        ]
    }))
    .unwrap();
    let created = store.add(draft).await.unwrap();

    let reopened = JsonFileStore::<MealPlan>::new(&path);
    let plan = reopened.get(&created.id).await.unwrap().unwrap();
    assert_eq!(plan, created);
    assert_eq!(plan.recipe_ids(), vec!["a", "b"]);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[0]["start_date"], "2026-03-02");
    assert_eq!(on_disk[0]["meals"][1]["date"], "2026-03-04");
}

#[tokio::test]
async fn file_backed_context_round_trip() {
    let tmp = TempDir::new().unwrap();
    let config = parse_config(&format!(
        r#"
[data]
dir = "{}"

[server]
bind = "127.0.0.1:0"

[ai]
provider = "disabled"

[recipe_search]
provider = "disabled"
"#,
        tmp.path().display()
    ))
    .unwrap();
    let ctx = AppContext::from_config(&config).unwrap();

    inventory::add_item(&ctx, NewInventoryItem::named("Tortillas"))
        .await
        .unwrap();
    let recipe = recipes::create_recipe(
        &ctx,
        NewRecipe {
            name: "Quesadilla".to_string(),
            ingredients: vec![
                larder_core::models::Ingredient {
                    name: "tortillas".to_string(),
                    quantity: 2.0,
                    unit: String::new(),
                },
                larder_core::models::Ingredient {
                    name: "cheese".to_string(),
                    quantity: 1.0,
                    unit: "cup".to_string(),
                },
            ],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let (missing, _) = shopping::add_missing_from_recipe(&ctx, &recipe.id)
        .await
        .unwrap();
    assert_eq!(missing, vec!["cheese"]);
    shopping::add_items(
        &ctx,
        vec![NewShoppingItem {
            name: "Cheese".to_string(),
            quantity: 1.0,
            unit: "cup".to_string(),
            notes: String::new(),
        }],
    )
    .await
    .unwrap();

    assert!(config.data.inventory_path().exists());
    assert!(config.data.recipes_path().exists());

    // A fresh context over the same directory sees everything.
    let reopened = AppContext::from_config(&config).unwrap();
    let list = shopping::list_items(&reopened, false).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].quantity, 2.0);
    let saved: Vec<Recipe> = reopened.recipes.list_all().await.unwrap();
    assert_eq!(saved[0].name, "Quesadilla");

    // The disabled extractor surfaces as an upstream failure, not a crash.
    let err = inventory::parse_text(&reopened, "two apples").await.unwrap_err();
    assert!(matches!(err, larder::error::ServiceError::Upstream(_)));
}
