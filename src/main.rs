//! # Larder CLI (`larder`)
//!
//! Runs the HTTP server and offers a few offline commands over the same
//! data directory.
//!
//! ## Usage
//!
//! ```bash
//! larder --config ./config/larder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `larder serve` | Start the HTTP API on `[server] bind` |
//! | `larder inventory` | Print the current inventory |
//! | `larder ingest <file>` | Add items from a `.txt` transcription or `.pdf` receipt |
//! | `larder find` | Rank saved and external recipes against the inventory |
//!
//! ## Examples
//!
//! ```bash
//! larder ingest ~/Downloads/receipt.pdf
//! larder find --preferences "vegetarian, quick" --limit 10
//! larder serve
//! ```

use clap::{Parser, Subcommand};
use larder::config;
use larder::context::AppContext;
use larder::finder::{find_recipes, FindRequest};
use larder::{inventory, logging, server};
use std::path::PathBuf;

/// Larder: food inventory, shopping list, and recipe matching.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/larder.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "larder",
    about = "Larder: food inventory, shopping list and recipe matching with AI-assisted ingestion",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/larder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve,

    /// Print the current inventory.
    Inventory,

    /// Add items from a voice-memo transcription (.txt) or receipt (.pdf).
    Ingest {
        /// Path to the file.
        file: PathBuf,
    },

    /// Find recipes that fit the inventory.
    ///
    /// Saved recipes are listed first, then results from the external
    /// recipe search, each ordered by how few ingredients are missing.
    Find {
        /// Free-text preferences used as the search query, e.g. "vegetarian".
        #[arg(long)]
        preferences: Option<String>,

        /// Maximum number of external results (1-20).
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Inventory => {
            let ctx = AppContext::from_config(&cfg)?;
            let items = inventory::list_items(&ctx).await?;
            if items.is_empty() {
                println!("Inventory is empty.");
            } else {
                println!("{:<28} {:>8} {:<10} {:<10} ADDED", "NAME", "QTY", "UNIT", "CATEGORY");
                for item in &items {
                    println!(
                        "{:<28} {:>8} {:<10} {:<10} {}",
                        item.name,
                        item.quantity,
                        item.unit,
                        item.category.as_str(),
                        item.added_date.format("%Y-%m-%d")
                    );
                }
                println!("\n{} items", items.len());
            }
        }
        Commands::Ingest { file } => {
            let ctx = AppContext::from_config(&cfg)?;
            let bytes = tokio::fs::read(&file).await?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = inventory::ingest_upload(&ctx, &filename, bytes).await?;
            println!("{}", outcome.message);
            for item in &outcome.items {
                println!("  + {} {} {} ({})", item.quantity, item.unit, item.name, item.category);
            }
        }
        Commands::Find { preferences, limit } => {
            let ctx = AppContext::from_config(&cfg)?;
            let result = find_recipes(
                &ctx,
                FindRequest {
                    preferences,
                    limit: Some(limit),
                },
            )
            .await?;
            if let Some(reason) = &result.external_error {
                eprintln!("External recipe search unavailable: {}", reason);
            }
            if result.recipes.is_empty() {
                println!("No recipes found.");
            }
            for (i, recipe) in result.recipes.iter().enumerate() {
                println!(
                    "{}. [{:?}] {} ({}% match, {}/{} ingredients)",
                    i + 1,
                    recipe.source,
                    recipe.name,
                    recipe.match_percentage,
                    recipe.has_ingredients.len(),
                    recipe.total_ingredients
                );
                if !recipe.missing_ingredients.is_empty() {
                    println!("    missing: {}", recipe.missing_ingredients.join(", "));
                }
            }
        }
    }

    Ok(())
}
