use rabbithole_core::{RabbitHoleError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod env_substitution;

pub use env_substitution::substitute_env_vars;

/// Overrides `api.base_url`.
pub const API_URL_ENV: &str = "RABBITHOLE_API_URL";
/// Overrides `storage.dir`.
pub const STORAGE_DIR_ENV: &str = "RABBITHOLE_STORAGE_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_site_name")]
    pub name: String,
}

/// Settings for the future HTTP backend. Nothing calls it yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Height of the sticky nav, subtracted from scroll targets.
    #[serde(default = "default_nav_height")]
    pub nav_height: f64,
    /// Offset added to the scroll position when picking the active section.
    #[serde(default = "default_active_offset")]
    pub active_offset: f64,
    /// Scroll position past which the nav switches to its compact state.
    #[serde(default = "default_shrink_threshold")]
    pub shrink_threshold: f64,
    #[serde(default = "default_error_banner_ms")]
    pub error_banner_ms: u64,
}

/// Selectors used to pull conversations out of the site markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSettings {
    #[serde(default = "default_block_selector")]
    pub block_selector: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_nav_link_selector")]
    pub nav_link_selector: String,
    #[serde(default = "default_filter_selector")]
    pub filter_selector: String,
}

/// Conceptual endpoint paths of the backend the storage shim stands in for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Endpoints;

impl Endpoints {
    pub fn conversations(&self) -> String {
        "/conversations".to_string()
    }

    pub fn conversation(&self, id: &str) -> String {
        format!("/conversations/{id}")
    }

    pub fn search(&self) -> String {
        "/conversations/search".to_string()
    }

    pub fn create(&self) -> String {
        self.conversations()
    }

    pub fn update(&self, id: &str) -> String {
        self.conversation(id)
    }

    pub fn delete(&self, id: &str) -> String {
        self.conversation(id)
    }
}

impl ApiSettings {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints
    }

    /// Join an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl UiSettings {
    pub fn error_banner_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.error_banner_ms)
    }
}

impl AppConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RabbitHoleError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut tree: serde_json::Value = serde_yaml::from_str(yaml)
            .map_err(|e| RabbitHoleError::ConfigError(format!("Failed to parse YAML: {}", e)))?;
        // An empty document parses as null.
        if tree.is_null() {
            tree = serde_json::Value::Object(Default::default());
        }

        substitute_env_vars(&mut tree)?;

        let mut config: AppConfig = serde_json::from_value(tree)
            .map_err(|e| RabbitHoleError::ConfigError(format!("Invalid configuration: {}", e)))?;

        config.expand_env_vars();
        config.validate()?;

        debug!("Loaded configuration for site '{}'", config.site.name);
        Ok(config)
    }

    /// Defaults with the environment overrides applied, for when no config
    /// file exists.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::default();
        config.expand_env_vars();
        config.validate()?;

        debug!("Using default configuration for site '{}'", config.site.name);
        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        if let Ok(url) = env::var(API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Ok(dir) = env::var(STORAGE_DIR_ENV) {
            self.storage.dir = PathBuf::from(dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.site.name.trim().is_empty() {
            return Err(RabbitHoleError::ConfigError("Site name cannot be empty".into()));
        }
        if self.api.base_url.is_empty() {
            return Err(RabbitHoleError::ConfigError("API base URL cannot be empty".into()));
        }
        if self.api.timeout_ms == 0 {
            return Err(RabbitHoleError::ConfigError("API timeout must be greater than zero".into()));
        }
        if self.storage.quota_bytes == Some(0) {
            return Err(RabbitHoleError::ConfigError("Storage quota must be greater than zero".into()));
        }
        for (name, value) in [
            ("nav_height", self.ui.nav_height),
            ("active_offset", self.ui.active_offset),
            ("shrink_threshold", self.ui.shrink_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RabbitHoleError::ConfigError(format!(
                    "ui.{name} must be a non-negative number"
                )));
            }
        }
        if self.seed.block_selector.trim().is_empty() {
            return Err(RabbitHoleError::ConfigError("Seed block selector cannot be empty".into()));
        }
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        rabbithole_home().join("config.yaml")
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            nav_height: default_nav_height(),
            active_offset: default_active_offset(),
            shrink_threshold: default_shrink_threshold(),
            error_banner_ms: default_error_banner_ms(),
        }
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            block_selector: default_block_selector(),
            title_selector: default_title_selector(),
            nav_link_selector: default_nav_link_selector(),
            filter_selector: default_filter_selector(),
        }
    }
}

fn default_site_name() -> String { "Rabbit Hole Findings".to_string() }
fn default_base_url() -> String { "http://localhost:3001/api".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_quota_bytes() -> Option<usize> { Some(5 * 1024 * 1024) }
fn default_nav_height() -> f64 { 80.0 }
fn default_active_offset() -> f64 { 120.0 }
fn default_shrink_threshold() -> f64 { 100.0 }
fn default_error_banner_ms() -> u64 { 5_000 }
fn default_block_selector() -> String { ".rabbit-hole-chat-wrapper".to_string() }
fn default_title_selector() -> String { "h2".to_string() }
fn default_nav_link_selector() -> String { r##"nav a[href^="#"]"##.to_string() }
fn default_filter_selector() -> String { ".filter-btn".to_string() }

fn rabbithole_home() -> PathBuf {
    env::var("HOME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|p| p.join(".rabbithole"))
                .unwrap_or_else(|| PathBuf::from("./.rabbithole"))
        })
}

fn default_storage_dir() -> PathBuf {
    rabbithole_home().join("storage")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
site:
  name: Test Warren
api:
  base_url: https://api.example.test/v1/
  timeout_ms: 2500
storage:
  dir: /tmp/rabbithole-test
  quota_bytes: 1024
ui:
  nav_height: 64
  error_banner_ms: 1500
"#;

        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.site.name, "Test Warren");
        assert_eq!(config.api.timeout_ms, 2500);
        assert_eq!(config.storage.quota_bytes, Some(1024));
        assert_eq!(config.ui.nav_height, 64.0);
        assert_eq!(config.ui.active_offset, 120.0);
        assert_eq!(config.seed.block_selector, ".rabbit-hole-chat-wrapper");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config.site.name, "Rabbit Hole Findings");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.ui.error_banner_ms, 5_000);
        assert_eq!(config.storage.quota_bytes, Some(5 * 1024 * 1024));
    }

    #[test]
    fn test_validation() {
        let yaml = r#"
site:
  name: ""
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());

        let yaml = r#"
api:
  timeout_ms: 0
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());

        let yaml = r#"
ui:
  nav_height: -5
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_endpoint_urls() {
        let api = ApiSettings {
            base_url: "https://api.example.test/v1/".to_string(),
            timeout_ms: 1000,
        };
        let endpoints = api.endpoints();
        assert_eq!(api.url(&endpoints.conversations()), "https://api.example.test/v1/conversations");
        assert_eq!(api.url(&endpoints.search()), "https://api.example.test/v1/conversations/search");
        assert_eq!(endpoints.update("abc"), "/conversations/abc");
        assert_eq!(endpoints.delete("abc"), endpoints.conversation("abc"));
        assert_eq!(endpoints.create(), "/conversations");
    }

    #[test]
    fn test_env_overrides_win() {
        env::set_var(API_URL_ENV, "https://override.example.test/api");
        env::set_var(STORAGE_DIR_ENV, "/tmp/rabbithole-override");

        let yaml = r#"
api:
  base_url: https://from-file.example.test/api
storage:
  dir: /tmp/from-file
"#;
        let from_file = AppConfig::from_yaml_str(yaml);
        let without_file = AppConfig::load_default();

        env::remove_var(API_URL_ENV);
        env::remove_var(STORAGE_DIR_ENV);

        for config in [from_file.unwrap(), without_file.unwrap()] {
            assert_eq!(config.api.base_url, "https://override.example.test/api");
            assert_eq!(config.storage.dir, PathBuf::from("/tmp/rabbithole-override"));
        }
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "site:\n  name: From File\n").unwrap();

        let config = AppConfig::from_yaml(&path).unwrap();
        assert_eq!(config.site.name, "From File");
        assert!(AppConfig::from_yaml(dir.path().join("missing.yaml")).is_err());
    }
}
