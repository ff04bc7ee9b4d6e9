//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `relay.toml` config file
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the config file is expanded from the environment.
//! Per-tenant settings (credentials, timings, catalog API) are not part of
//! this file; they live in the tenant directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Main configuration for wa-relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tenant directory configuration
    #[serde(default)]
    pub tenants: TenantsConfig,

    /// Event scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Catalog refresh configuration
    #[serde(default)]
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Permissive when unset.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// Directory holding one `<tenant_id>.json` file per tenant
    #[serde(default = "default_tenants_dir")]
    pub dir: String,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            dir: default_tenants_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Whether lifecycle events arm delayed actions
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay between a review request and its chained upsell offer
    #[serde(default = "default_upsell_delay_secs")]
    pub upsell_delay_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            upsell_delay_secs: default_upsell_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Whether tenants with an enabled product API are refreshed periodically
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            refresh_enabled: true,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/wa-relay.db".to_string()
}

fn default_tenants_dir() -> String {
    "data/tenants".to_string()
}

fn default_upsell_delay_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Expand `${VAR_NAME}` references from the environment.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let mut cfg: Config = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Load configuration from the default location
    ///
    /// Uses `./relay.toml` when present, otherwise defaults plus environment.
    pub fn load() -> crate::Result<Self> {
        if Path::new("relay.toml").exists() {
            return Self::from_toml_file("relay.toml");
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Override settings with environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            self.server.allowed_origins =
                Some(origins.split(',').map(|s| s.trim().to_string()).collect());
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                self.storage.db_path = path;
            }
        }

        if let Ok(dir) = std::env::var("TENANTS_DIR") {
            if !dir.is_empty() {
                self.tenants.dir = dir;
            }
        }

        if let Ok(enabled) = std::env::var("SCHEDULER_ENABLED") {
            self.scheduler.enabled = enabled.to_lowercase() != "false";
        }
        if let Ok(secs) = std::env::var("UPSELL_DELAY_SECS") {
            if let Ok(s) = secs.parse() {
                self.scheduler.upsell_delay_secs = s;
            }
        }

        if let Ok(enabled) = std::env::var("CATALOG_REFRESH_ENABLED") {
            self.catalog.refresh_enabled = enabled.to_lowercase() != "false";
        }
    }
}
