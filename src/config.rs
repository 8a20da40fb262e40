use anyhow::{Context, Result};
use larder_core::matching::MatchStrategy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub recipe_search: RecipeSearchConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl DataConfig {
    pub fn inventory_path(&self) -> PathBuf {
        self.dir.join("inventory.json")
    }

    pub fn shopping_list_path(&self) -> PathBuf {
        self.dir.join("shopping_list.json")
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.dir.join("user_recipes.json")
    }

    pub fn meal_plans_path(&self) -> PathBuf {
        self.dir.join("meal_plans.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout_secs(),
            base_url: default_ai_base_url(),
        }
    }
}

fn default_ai_provider() -> String {
    "openai".to_string()
}
fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_ai_timeout_secs() -> u64 {
    60
}
fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecipeSearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_search_url")]
    pub url: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RecipeSearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            url: default_search_url(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_provider() -> String {
    "api-ninjas".to_string()
}
fn default_search_url() -> String {
    "https://api.api-ninjas.com/v2/recipe".to_string()
}
fn default_search_timeout_secs() -> u64 {
    10
}

impl RecipeSearchConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchingConfig {
    #[serde(default)]
    pub strategy: MatchStrategy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.data.dir.as_os_str().is_empty() {
        anyhow::bail!("data.dir must not be empty");
    }

    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        anyhow::bail!(
            "server.bind must be a socket address like 127.0.0.1:5000, got '{}'",
            config.server.bind
        );
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    match config.ai.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown ai provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.ai.timeout_secs == 0 {
        anyhow::bail!("ai.timeout_secs must be > 0");
    }

    match config.recipe_search.provider.as_str() {
        "disabled" | "api-ninjas" => {}
        other => anyhow::bail!(
            "Unknown recipe_search provider: '{}'. Must be disabled or api-ninjas.",
            other
        ),
    }
    if config.recipe_search.timeout_secs == 0 {
        anyhow::bail!("recipe_search.timeout_secs must be > 0");
    }

    match config.logging.format.as_str() {
        "pretty" | "json" => {}
        other => anyhow::bail!("logging.format must be pretty or json, got '{}'", other),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[data]
dir = "./data"

[server]
bind = "127.0.0.1:5000"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.ai.provider, "openai");
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert_eq!(config.ai.timeout_secs, 60);
        assert_eq!(config.recipe_search.timeout_secs, 10);
        assert_eq!(config.matching.strategy, MatchStrategy::Substring);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(
            config.data.inventory_path(),
            PathBuf::from("./data/inventory.json")
        );
        assert_eq!(
            config.data.meal_plans_path(),
            PathBuf::from("./data/meal_plans.json")
        );
    }

    #[test]
    fn whole_word_strategy_parses() {
        let text = format!("{}\n[matching]\nstrategy = \"whole-word\"\n", MINIMAL);
        let config = parse_config(&text).unwrap();
        assert_eq!(config.matching.strategy, MatchStrategy::WholeWord);
    }

    #[test]
    fn rejects_unknown_providers_and_bad_values() {
        let bad_ai = format!("{}\n[ai]\nprovider = \"llama\"\n", MINIMAL);
        assert!(parse_config(&bad_ai).is_err());

        let bad_search = format!("{}\n[recipe_search]\nprovider = \"spoonacular\"\n", MINIMAL);
        assert!(parse_config(&bad_search).is_err());

        let zero_upload = format!("{}\n[upload]\nmax_bytes = 0\n", MINIMAL);
        assert!(parse_config(&zero_upload).is_err());

        let bad_bind = MINIMAL.replace("127.0.0.1:5000", "localhost");
        assert!(parse_config(&bad_bind).is_err());
    }

    #[test]
    fn server_section_is_required() {
        assert!(parse_config("[data]\ndir = \"./data\"\n").is_err());
    }

    #[test]
    fn example_config_parses() {
        let config = parse_config(include_str!("../config/larder.example.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(config.ai.is_enabled());
    }
}
