//! Layered CLI configuration.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file, the
//! `PU_SERVER_URL` environment variable, command-line flags.
//!
//! The config file lives at `$XDG_CONFIG_HOME/pu/config.json` (falling back
//! to `~/.config/pu/config.json`) unless `--config` names another one. A
//! missing default file is fine; a missing explicit file is an error.


use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pu::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Environment variable overriding the server URL.
pub const SERVER_URL_ENV: &str = "PU_SERVER_URL";

/// On-disk configuration. Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub server_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub progress_path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reconnect_delay_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retry_delay_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_silent_retries: Option<RetryLimit>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_timeout_ms: Option<u64>,
}

/// `"max_silent_retries": 5` or `"max_silent_retries": "unbounded"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetryLimit {
	Count(u32),
	Keyword(Unbounded),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unbounded {
	Unbounded,
}

impl RetryLimit {
	fn into_limit(self) -> Option<u32> {
		match self {
			RetryLimit::Count(n) => Some(n),
			RetryLimit::Keyword(Unbounded::Unbounded) => None,
		}
	}
}

impl ConfigFile {
	/// Applies the keys present in this file on top of `config`.
	pub fn apply(self, config: &mut SessionConfig) {
		if let Some(url) = self.server_url {
			config.server_url = url;
		}
		if let Some(path) = self.progress_path {
			config.progress_path = path;
		}
		if let Some(ms) = self.reconnect_delay_ms {
			config.reconnect_delay = Duration::from_millis(ms);
		}
		if let Some(ms) = self.retry_delay_ms {
			config.retry_delay = Duration::from_millis(ms);
		}
		if let Some(limit) = self.max_silent_retries {
			config.max_silent_retries = limit.into_limit();
		}
		if let Some(ms) = self.request_timeout_ms {
			config.request_timeout = Some(Duration::from_millis(ms));
		}
	}
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."));
	config_home.join("pu").join("config.json")
}

/// Reads a config file. `Ok(None)` when `path` does not exist.
pub fn load_config_file(path: &Path) -> Result<Option<ConfigFile>> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => {
			return Err(CliError::Config {
				path: path.to_path_buf(),
				message: err.to_string(),
			});
		}
	};
	serde_json::from_str(&content).map(Some).map_err(|err| CliError::Config {
		path: path.to_path_buf(),
		message: err.to_string(),
	})
}

/// Inputs that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
	/// `--config`
	pub config_path: Option<&'a Path>,
	/// `PU_SERVER_URL`
	pub env_server_url: Option<String>,
	/// `--server`
	pub server_url: Option<&'a str>,
}

impl<'a> Overrides<'a> {
	/// Overrides from the flags and the process environment.
	pub fn from_env(config_path: Option<&'a Path>, server_url: Option<&'a str>) -> Self {
		Self {
			config_path,
			env_server_url: std::env::var(SERVER_URL_ENV).ok().filter(|v| !v.trim().is_empty()),
			server_url,
		}
	}
}

/// Resolves the effective session configuration.
pub fn resolve(overrides: Overrides<'_>) -> Result<SessionConfig> {
	let mut config = SessionConfig::default();

	let file = match overrides.config_path {
		Some(path) => Some(load_config_file(path)?.ok_or_else(|| CliError::Config {
			path: path.to_path_buf(),
			message: "file not found".into(),
		})?),
		None => load_config_file(&default_config_path())?,
	};
	if let Some(file) = file {
		file.apply(&mut config);
	}

	if let Some(url) = overrides.env_server_url {
		config.server_url = url;
	}
	if let Some(url) = overrides.server_url {
		config.server_url = url.to_string();
	}

	config.validate().map_err(|err| CliError::InvalidConfig(err.to_string()))?;
	tracing::debug!(server_url = %config.server_url, "configuration resolved");
	Ok(config)
}
