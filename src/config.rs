//! Configuration loading
//!
//! Looked up in order:
//! - `--config PATH`
//! - `$PHONEDESK_CONFIG`
//! - `<config dir>/phonedesk/config.toml`
//!
//! A missing file yields defaults. `PHONEDESK_API_BASE_URL` and
//! `PHONEDESK_API_TOKEN` override the `[api]` section.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::api::http::DEFAULT_TIMEOUT_SECS;
use crate::numbers::fetcher::DEFAULT_PAGE_LIMIT;
use crate::numbers::snapshot::DEFAULT_CSV_FILE;

pub const CONFIG_ENV: &str = "PHONEDESK_CONFIG";
pub const BASE_URL_ENV: &str = "PHONEDESK_API_BASE_URL";
pub const TOKEN_ENV: &str = "PHONEDESK_API_TOKEN";

/// Environment used when none is given
pub const DEFAULT_ENVIRONMENT: &str = "prod";

/// Static single-connection mode
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default = "default_csv_file")]
    pub csv_file: PathBuf,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

fn default_csv_file() -> PathBuf {
    PathBuf::from(DEFAULT_CSV_FILE)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
            csv_file: default_csv_file(),
        }
    }
}

/// Admin credentials for one deployment (prod, staging, qa...)
#[derive(Clone, Deserialize, Serialize)]
pub struct EnvironmentConfig {
    pub url: String,
    pub user_id: String,
    pub password: String,
    pub org_id: String,
}

impl std::fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("url", &self.url)
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .field("org_id", &self.org_id)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// Trim a secret and strip one pair of surrounding quotes
pub fn clean_secret(value: &str) -> String {
    let value = value.trim();
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("phonedesk").join("config.toml"))
            .ok_or_else(|| anyhow!("Could not determine config directory"))
    }

    /// Load from an explicit path, the environment, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => match env::var(CONFIG_ENV) {
                Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
                _ => Self::default_path().ok(),
            },
        };

        let mut config = match path {
            Some(ref p) if p.exists() => {
                debug!("Loading config from {}", p.display());
                let content = fs::read_to_string(p)
                    .with_context(|| format!("Failed to read {}", p.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("Invalid config file {}", p.display()))?
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.clean();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `[api]` overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    fn clean(&mut self) {
        self.api.base_url = self.api.base_url.as_deref().map(clean_secret);
        self.api.token = self.api.token.as_deref().map(clean_secret);
        for environment in self.environments.values_mut() {
            environment.url = clean_secret(&environment.url);
            environment.user_id = clean_secret(&environment.user_id);
            environment.password = clean_secret(&environment.password);
            environment.org_id = clean_secret(&environment.org_id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.page_limit == 0 {
            bail!("settings.page_limit must be greater than zero");
        }
        if self.settings.timeout_secs == 0 {
            bail!("settings.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    /// Admin credentials for `name`
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.environments.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            anyhow!(
                "Environment '{}' is not configured (known: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }

    /// Static-mode base URL and token, with optional per-call overrides
    pub fn static_target(
        &self,
        url: Option<&str>,
        token: Option<&str>,
    ) -> Result<(String, String)> {
        let url = url
            .map(str::to_string)
            .or_else(|| self.api.base_url.clone())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow!("No API base URL: set [api].base_url or {}", BASE_URL_ENV))?;
        let token = token
            .map(str::to_string)
            .or_else(|| self.api.token.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("No API token: set [api].token or {}", TOKEN_ENV))?;
        Ok((url, token))
    }
}
