use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bandit_api: BanditApiConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "target/db/equipment.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BanditApiConfig {
    /// Base of the WordPress REST namespace, e.g. "https://banditchippers.com/wp-json/wp/v2/"
    pub base_url: String,
    pub timeout_secs: u64,
    /// Page size for listing endpoints (WordPress caps it at 100)
    pub per_page: u32,
}

impl Default for BanditApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://banditchippers.com/wp-json/wp/v2/".to_string(),
            timeout_secs: 30,
            per_page: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaxonomyConfig {
    /// Taxonomy namespace the equipment families live in
    pub slug: String,
    /// Record type written for imported equipment
    pub post_type: String,
    /// Parent term for newly created families, 0 = top level
    pub top_level_parent: i64,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            slug: "bandit_equipment_family".to_string(),
            post_type: "bandit_equipment".to_string(),
            top_level_parent: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Cron expression (with seconds) for the scheduled import; empty disables it
    pub schedule: String,
    pub progress_ttl_minutes: i64,
    /// Advisory run budget; exceeding it is only logged
    pub execution_budget_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            schedule: String::new(),
            progress_ttl_minutes: 30,
            execution_budget_secs: 1800,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            log_dir: "target/logs".to_string(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/equipment.db"

[bandit_api]
base_url = "https://banditchippers.com/wp-json/wp/v2/"
timeout_secs = 30
per_page = 100

[taxonomy]
slug = "bandit_equipment_family"
post_type = "bandit_equipment"
top_level_parent = 0

[import]
schedule = ""
progress_ttl_minutes = 30
execution_budget_secs = 1800

[server]
port = 3000
log_dir = "target/logs"
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Explicit path (from `--config`)
/// 2. Next to the executable (for production)
/// 3. Falls back to embedded default config
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");
            if config_path.exists() {
                return read_config(&config_path);
            }
        }
    }

    // Fall back to default config
    Ok(toml::from_str(DEFAULT_CONFIG)?)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    // If absolute path, use as is
    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    // If relative path, resolve it relative to the executable directory
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}
