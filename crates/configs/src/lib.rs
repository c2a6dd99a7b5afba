use std::collections::BTreeMap;

use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Record services keyed by their mount name (`[services.books]`).
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

/// Per-service settings as written in `[services.<name>]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceSettings {
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub paginate: Option<PaginationSettings>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub multi: Option<MultiSetting>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct PaginationSettings {
    #[serde(default)]
    pub default: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

/// `multi = true | false | ["create", "patch", "remove"]`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MultiSetting {
    Flag(bool),
    Methods(Vec<String>),
}

pub const MULTI_METHODS: [&str; 3] = ["create", "patch", "remove"];

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // database url may come from the environment when absent in TOML
        self.database.normalize_from_env();
        self.database.validate()?;
        for (name, svc) in self.services.iter_mut() {
            svc.normalize_and_validate(name)?;
        }
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSettings> {
        self.services.get(name)
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            dotenvy::dotenv().ok();
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl ServiceSettings {
    fn normalize_and_validate(&mut self, name: &str) -> Result<()> {
        if let Some(id) = &self.id_field {
            if id.trim().is_empty() {
                self.id_field = None;
            }
        }
        if let Some(PaginationSettings { default: Some(d), max: Some(m) }) = self.paginate {
            if d > m {
                return Err(anyhow!("services.{name}.paginate.default ({d}) exceeds max ({m})"));
            }
        }
        if let Some(MultiSetting::Methods(methods)) = &self.multi {
            if let Some(bad) = methods.iter().find(|m| !MULTI_METHODS.contains(&m.as_str())) {
                return Err(anyhow!("services.{name}.multi: unknown method '{bad}'"));
            }
        }
        self.events.retain(|e| !e.trim().is_empty());
        Ok(())
    }
}
