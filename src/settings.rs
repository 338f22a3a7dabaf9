use crate::http::NETWORK_ERROR_MESSAGE;
use crate::state::StoreOptions;
use crate::types::AlertClearPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_SETTINGS_PATH: &str = "MICROBLOG_SETTINGS";
pub const ENV_API_BASE_URL: &str = "MICROBLOG_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_STORAGE_FILE: &str = "microblog-client-storage.json";
const DEFAULT_ALERT_CLEAR_DELAY_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read settings file {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("settings file {path} is not valid json")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageSettings {
  File { path: PathBuf },
  Keyring { service: String },
  Memory,
}

impl Default for StorageSettings {
  fn default() -> Self {
    Self::File {
      path: PathBuf::from(DEFAULT_STORAGE_FILE),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
  pub api_base_url: String,
  pub alert_clear_delay_ms: u64,
  pub alert_clear_policy: AlertClearPolicy,
  pub network_error_message: String,
  pub request_timeout_ms: Option<u64>,
  pub storage: StorageSettings,
}

impl Default for ClientSettings {
  fn default() -> Self {
    Self {
      api_base_url: DEFAULT_API_BASE_URL.to_string(),
      alert_clear_delay_ms: DEFAULT_ALERT_CLEAR_DELAY_MS,
      alert_clear_policy: AlertClearPolicy::TypeAndMessage,
      network_error_message: NETWORK_ERROR_MESSAGE.to_string(),
      request_timeout_ms: None,
      storage: StorageSettings::default(),
    }
  }
}

impl ClientSettings {
  /// Reads `path`, or the file named by `MICROBLOG_SETTINGS`, then applies env overrides.
  /// Without either, the defaults are used.
  pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
    let env_path = std::env::var_os(ENV_SETTINGS_PATH).map(PathBuf::from);
    let settings = match path.map(Path::to_path_buf).or(env_path) {
      Some(path) => Self::from_file(&path)?,
      None => Self::default(),
    };
    Ok(settings.with_overrides(|key| std::env::var(key).ok()))
  }

  pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&text).map_err(|source| SettingsError::Json {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(url) = lookup(ENV_API_BASE_URL) {
      let url = url.trim();
      if !url.is_empty() {
        self.api_base_url = url.to_string();
      }
    }
    self
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      alert_clear_delay: Duration::from_millis(self.alert_clear_delay_ms),
      alert_clear_policy: self.alert_clear_policy,
    }
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
  }
}
