// File: src/config.rs
// Purpose: Configuration parsing from ballot.toml plus environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Prefix under which every controller is mounted (default: "/api")
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Directory holding layout.html and the 404 page (default: "app")
    #[serde(default = "default_app_dir")]
    pub app_dir: String,

    /// Directory containing the page tree (default: "app/pages")
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Prefix that marks a directory or file as a dynamic segment (default: ':')
    #[serde(default = "default_dynamic_marker")]
    pub dynamic_marker: char,
}

/// Static asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted JSON body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

/// Values exposed to every page template under `site.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevConfig {
    /// Re-read templates from disk on every render and disable asset caching
    #[serde(default)]
    pub development: bool,
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_root() -> String {
    "/api".to_string()
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_pages_dir() -> String {
    "app/pages".to_string()
}

fn default_dynamic_marker() -> char {
    ':'
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_database_url() -> String {
    "sqlite://ballot.db?mode=rwc".to_string()
}

fn default_site_name() -> String {
    "Ballot".to_string()
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            app_dir: default_app_dir(),
            pages_dir: default_pages_dir(),
            dynamic_marker: default_dynamic_marker(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load from `$BALLOT_CONFIG` (or ./ballot.toml) and apply environment overrides
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("BALLOT_CONFIG").unwrap_or_else(|_| "ballot.toml".to_string());
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("BALLOT_ENV").or_else(|| lookup("APP_ENV")) {
            self.dev.development = env.eq_ignore_ascii_case("development");
        }

        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.dev.development
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn app_dir(&self) -> PathBuf {
        PathBuf::from(&self.routing.app_dir)
    }

    pub fn pages_dir(&self) -> PathBuf {
        PathBuf::from(&self.routing.pages_dir)
    }

    pub fn public_dir(&self) -> PathBuf {
        PathBuf::from(&self.assets.public_dir)
    }
}
