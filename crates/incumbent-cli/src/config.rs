//! Layered configuration: an optional TOML file under `INCUMBENT_`-prefixed
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use incumbent_core::registry::RegistryConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub registry:   RegistryConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/incumbent/incumbent.db"),
      registry:   RegistryConfig::default(),
    }
  }
}

impl AppConfig {
  /// Read `file` (if it exists), then the environment. Nested keys use a
  /// double underscore: `INCUMBENT_REGISTRY__OP_TIMEOUT_MS=2000`.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("INCUMBENT")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
