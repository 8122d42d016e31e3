use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Public NCMEC servlet root
pub const DEFAULT_BASE_URL: &str = "https://api.missingkids.org/missingkids/servlet/";

/// State searched when none is configured
pub const DEFAULT_STATE: &str = "CA";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Override for the SQLite database location
  pub db_path: Option<PathBuf>,
  /// Start a network sync as soon as the TUI opens
  #[serde(default)]
  pub refresh_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Two-letter state code sent as `missState`
  #[serde(default = "default_state", deserialize_with = "deserialize_uppercase")]
  pub state: String,
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_state() -> String {
  DEFAULT_STATE.to_string()
}

fn deserialize_uppercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  Ok(s.trim().to_uppercase())
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      state: default_state(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./mk9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/mk9s/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("mk9s.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("mk9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Host (and explicit port) of the base URL, for the header bar.
  ///
  /// Falls back to the raw base URL when it does not parse.
  pub fn service_host(&self) -> String {
    let raw = &self.api.base_url;
    let Ok(url) = Url::parse(raw) else {
      return raw.clone();
    };
    match (url.host_str(), url.port()) {
      (Some(host), Some(port)) => format!("{}:{}", host, port),
      (Some(host), None) => host.to_string(),
      (None, _) => raw.clone(),
    }
  }
}
