//! # Larder
//!
//! A locally hosted food inventory with AI-assisted ingestion and recipe
//! matching.
//!
//! Voice-memo transcriptions and PDF receipts are turned into inventory
//! items by a language model. A shopping list, a personal recipe library and
//! meal plans live next to the inventory, and recipes (saved or found through an
//! external search service) are ranked by how much of each the inventory
//! already covers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Upload / CLI │──▶│  Extractor  │──▶│ JSON files │
//! │  .txt  .pdf  │   │  (OpenAI)   │   │ inventory  │
//! └──────────────┘   └─────────────┘   │ shopping   │
//!                                      │ recipes    │
//!                                      │ meal plans │
//!                                      └─────┬──────┘
//!                                            │
//!          ┌──────────────┐            ┌─────▼──────┐
//!          │ RecipeSearch │───────────▶│  Matching  │──▶ ranked recipes
//!          │ (API Ninjas) │            │   engine   │
//!          └──────────────┘            └────────────┘
//! ```
//!
//! Pure logic (models, matching, output parsing, the `Store` trait) lives in
//! the `larder-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`error`] | Service error type |
//! | [`file_store`] | JSON file `Store` backend |
//! | [`extract`] | Upload validation and text extraction |
//! | [`openai`] | OpenAI extractor |
//! | [`recipe_api`] | API Ninjas recipe search |
//! | [`context`] | Shared application state |
//! | [`inventory`] | Inventory operations and upload ingestion |
//! | [`shopping`] | Shopping list operations |
//! | [`recipes`] | Recipe library operations |
//! | [`importer`] | Recipe import from URLs and text |
//! | [`meal_plans`] | Meal plans and their shopping needs |
//! | [`finder`] | Unified recipe finder |
//! | [`server`] | HTTP API |

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod file_store;
pub mod finder;
pub mod importer;
pub mod inventory;
pub mod logging;
pub mod meal_plans;
pub mod openai;
pub mod recipe_api;
pub mod recipes;
pub mod server;
pub mod shopping;
