//! Client configuration: defaults, then TOML file, then `BLASTWATCH_*` env

use anyhow::{Context, Result};
use blastwatch_core::application::constants::{
    DEFAULT_MAX_CONSECUTIVE_POLL_ERRORS, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
use blastwatch_core::application::PollPolicy;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const ENV_PREFIX: &str = "BLASTWATCH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// 0 = poll until a terminal status
    pub max_poll_attempts: u32,
    pub max_consecutive_poll_errors: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            max_consecutive_poll_errors: DEFAULT_MAX_CONSECUTIVE_POLL_ERRORS,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment and the given (or default) config file
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(raw) => (Some(PathBuf::from(shellexpand::tilde(raw).into_owned())), true),
            None => (default_config_path(), false),
        };
        Self::load_from(path.as_deref(), required, None)
    }

    /// Layered load; `env` replaces the process environment when given
    pub fn load_from(
        path: Option<&Path>,
        required: bool,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&ClientConfig::default()).context("Failed to encode defaults")?,
        );

        if let Some(path) = path {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config: ClientConfig = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: self.request_timeout(),
            max_attempts: (self.max_poll_attempts > 0).then_some(self.max_poll_attempts),
            max_consecutive_errors: self.max_consecutive_poll_errors,
        }
    }
}

/// `<config dir>/blastwatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "blastwatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::load_from(None, false, no_env()).unwrap();
        assert_eq!(config, ClientConfig::default());

        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_attempts, Some(900));
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_url = \"https://blast.example.org\"\npoll_interval_ms = 500\nmax_poll_attempts = 0"
        )
        .unwrap();

        let env = HashMap::from([(
            "BLASTWATCH_POLL_INTERVAL_MS".to_string(),
            "750".to_string(),
        )]);
        let config = ClientConfig::load_from(Some(file.path()), true, Some(env)).unwrap();

        assert_eq!(config.base_url, "https://blast.example.org");
        assert_eq!(config.poll_interval_ms, 750);
        assert_eq!(config.poll_policy().max_attempts, None);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_optional_file_is_fine() {
        let missing = Path::new("/nonexistent/blastwatch/config.toml");
        assert!(ClientConfig::load_from(Some(missing), false, no_env()).is_ok());
        assert!(ClientConfig::load_from(Some(missing), true, no_env()).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let env = HashMap::from([(
            "BLASTWATCH_POLL_INTERVAL_MS".to_string(),
            "0".to_string(),
        )]);
        assert!(ClientConfig::load_from(None, false, Some(env)).is_err());
    }
}
