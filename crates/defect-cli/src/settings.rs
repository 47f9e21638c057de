//! Layered runtime configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. the TOML file named by `--config` (skipped if absent)
//! 3. `DEFECT_*` environment variables, `__` between nested keys, e.g.
//!    `DEFECT_NHTSA__TIMEOUT_SECS=10` or `DEFECT_SERVER__PORT=8080`

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use defect_ingest::{NhtsaConfig, RetryPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path: PathBuf,
  pub nhtsa:      NhtsaConfig,
  pub retry:      RetryPolicy,
  pub server:     ServerSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/defect/defect.db"),
      nhtsa:      NhtsaConfig::default(),
      retry:      RetryPolicy::default(),
      server:     ServerSettings::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
  pub host: String,
  pub port: u16,
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".into(),
      port: 8080,
    }
  }
}

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("DEFECT")
          .prefix_separator("_")
          .separator("__"),
      );
    Self::build(builder)
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
    let mut settings: Self = builder
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("invalid configuration")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server.host, self.server.port)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
