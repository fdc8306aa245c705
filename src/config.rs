use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::api::DEFAULT_API_URL;
use crate::app_dirs::AppDirs;
use crate::source::RetryPolicy;

/// Application settings read from `config.json`. Session data is never written here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub rate_limit_backoff_secs: u64,
    pub max_rate_limit_retries: u32,
    pub max_credential_renewals: u32,
}

impl Default for Config {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
            rate_limit_backoff_secs: 5,
            max_rate_limit_retries: policy.max_rate_limit_retries,
            max_credential_renewals: policy.max_credential_renewals,
        }
    }
}

impl Config {
    /// Replaces values that would make every request fail
    pub fn sanitized(mut self) -> Self {
        if self.timeout_secs == 0 {
            warn!("timeout_secs of 0 would fail every request, using 1");
            self.timeout_secs = 1;
        }
        if self.max_rate_limit_retries == 0 {
            warn!("max_rate_limit_retries is 0, rate-limited fetches fail without retrying");
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_rate_limit_retries: self.max_rate_limit_retries,
            max_credential_renewals: self.max_credential_renewals,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("trivia_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg.sanitized(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = Config {
            api_url: "http://localhost:8080".into(),
            timeout_secs: 3,
            rate_limit_backoff_secs: 1,
            max_rate_limit_retries: 5,
            max_credential_renewals: 2,
        };
        fs::write(&path, serde_json::to_vec_pretty(&cfg).unwrap()).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg, loaded);
        assert_eq!(loaded.timeout(), Duration::from_secs(3));
        assert_eq!(
            loaded.retry_policy(),
            RetryPolicy {
                max_rate_limit_retries: 5,
                max_credential_renewals: 2
            }
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "timeout_secs": 30 }"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.timeout_secs, 30);
        assert_eq!(loaded.api_url, DEFAULT_API_URL);
        assert_eq!(loaded.backoff(), Duration::from_secs(5));
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "timeout_secs": 0, "max_rate_limit_retries": 0 }"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.timeout(), Duration::from_secs(1));
        assert_eq!(loaded.retry_policy().max_rate_limit_retries, 0);
    }

    #[test]
    fn store_reports_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(FileConfigStore::with_path(&path).path(), path.as_path());
    }

    #[test]
    fn malformed_config_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }
}
