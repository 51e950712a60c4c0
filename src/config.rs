use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::control_plane::ApiConfig;
use crate::error::{Error, Result};
use crate::orchestrator::RestartSettings;

pub const CONFIG_FILE_NAME: &str = "rolling-restart.toml";

/// Settings loaded from `rolling-restart.toml` and `RR_*` environment variables.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestartConfig {
    /// Base URL of the cluster manager API, e.g. `https://cm:7183/api/v31`.
    pub api_url: Option<String>,
    pub cluster: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Set to `false` for self-signed control plane certificates.
    pub verify_tls: Option<bool>,
    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    /// Seconds to wait after an instance is healthy.
    pub delay: Option<f64>,
    pub poll_interval: Option<u64>,
    pub max_probe_failures: Option<u32>,
    /// Seconds to wait for an instance to become healthy before aborting.
    pub health_timeout: Option<u64>,
}

impl RestartConfig {
    /// Search for `rolling-restart.toml` in the current directory and ancestors.
    pub fn discover() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| Error::InvalidConfig {
            reason: format!("invalid config in {}: {e}", path.display()),
        })
    }

    pub fn find_config_path() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        cwd.ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overrides fields from `RR_API_URL`, `RR_CLUSTER`, `RR_USER`,
    /// `RR_PASSWORD` and `RR_VERIFY_TLS` as returned by `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RR_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(cluster) = lookup("RR_CLUSTER") {
            self.cluster = Some(cluster);
        }
        if let Some(user) = lookup("RR_USER") {
            self.username = Some(user);
        }
        if let Some(password) = lookup("RR_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(raw) = lookup("RR_VERIFY_TLS") {
            self.verify_tls = Some(parse_bool("RR_VERIFY_TLS", &raw)?);
        }
        Ok(())
    }

    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_url = self
            .api_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                reason: format!(
                    "no control plane URL; set api_url in {CONFIG_FILE_NAME}, RR_API_URL or --api-url"
                ),
            })?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(Error::InvalidConfig {
                reason: format!("api_url must be an http(s) URL, got {api_url}"),
            });
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(Error::InvalidConfig {
                reason: "username and password must be set together".to_string(),
            });
        }

        let defaults = ApiConfig::default();
        Ok(ApiConfig {
            api_url,
            cluster: self.cluster.clone().unwrap_or(defaults.cluster),
            username: self.username.clone(),
            password: self.password.clone(),
            verify_tls: self.verify_tls.unwrap_or(defaults.verify_tls),
            timeout_secs: self.timeout.unwrap_or(defaults.timeout_secs),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            user_agent: defaults.user_agent,
        })
    }

    /// Run settings; the selection policy is left at its default.
    pub fn restart_settings(&self) -> Result<RestartSettings> {
        let defaults = RestartSettings::default();

        let delay = match self.delay {
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| Error::InvalidConfig {
                reason: format!("delay must be a non-negative number of seconds, got {secs}: {e}"),
            })?,
            None => defaults.delay,
        };
        let poll_interval = match self.poll_interval {
            Some(0) => {
                return Err(Error::InvalidConfig {
                    reason: "poll_interval must be at least one second".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.poll_interval,
        };

        Ok(RestartSettings {
            delay,
            poll_interval,
            max_probe_failures: self
                .max_probe_failures
                .unwrap_or(defaults.max_probe_failures),
            health_timeout: self.health_timeout.map(Duration::from_secs),
            ..defaults
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::InvalidConfig {
            reason: format!("{key} must be a boolean, got '{other}'"),
        }),
    }
}
