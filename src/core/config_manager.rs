// src/core/config_manager.rs
//! Configuration loading: `config.yaml` sections selected by environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::utils::{ensure_dir_exists, resolve_path};

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: String,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// Shared secret for HS256 tokens (local development and tests)
    #[serde(default)]
    pub hs256_secret: Option<String>,
    /// URL returning a `{kid: pem}` map of RS256 signing keys
    #[serde(default)]
    pub keys_url: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_max_entries() -> usize {
    10_000
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: AppConfig,
    production: AppConfig,
}

impl ConfigManager {
    /// Load configuration for the current environment from `config_path`
    pub fn load(config_path: &Path) -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        if !config_path.exists() {
            anyhow::bail!(
                "{} not found. Server cannot start without configuration.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut app = Self::from_yaml(&content, &environment)?;
        Self::apply_overrides(
            &mut app,
            std::env::var("LANDR_DATABASE_PATH").ok(),
            std::env::var("ROCKET_PORT").ok(),
        )?;

        Ok(Self { environment, app })
    }

    /// Parse a config document and pick the section for `environment`
    pub fn from_yaml(content: &str, environment: &str) -> Result<AppConfig> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;

        let mut app = match environment {
            "production" => config_file.production,
            _ => config_file.local,
        };

        app.database_path = resolve_path(&app.database_path)?;
        if let Some(log_file) = &app.log_file {
            app.log_file = Some(resolve_path(log_file)?);
        }

        Ok(app)
    }

    /// Deployment overrides (`LANDR_DATABASE_PATH`, `ROCKET_PORT`) win over the file
    pub fn apply_overrides(
        app: &mut AppConfig,
        database_path: Option<String>,
        port: Option<String>,
    ) -> Result<()> {
        if let Some(path) = database_path {
            app.database_path = resolve_path(Path::new(&path))?;
        }

        if let Some(port) = port {
            app.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }

        Ok(())
    }

    fn get_environment() -> String {
        std::env::var("LANDR_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Ensure the database parent directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.app.database_path.parent() {
            ensure_dir_exists(db_parent).await?;
        }
        if let Some(log_parent) = self.app.log_file.as_ref().and_then(|p| p.parent()) {
            ensure_dir_exists(log_parent).await?;
        }
        Ok(())
    }
}
