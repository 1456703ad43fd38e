use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use logger::LogConfig;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "restql.yml";

/// Mirrors `internal/plataform/conf.Config`: web bind addresses, the
/// timeout hierarchy, logging options, and the statically configured
/// (non-env) resource mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_api_addr")]
  pub api_addr: String,
  #[serde(default = "default_health_addr")]
  pub health_addr: String,
  #[serde(default = "default_tenant")]
  pub tenant: String,
  #[serde(default = "default_global_timeout_ms", with = "millis")]
  pub global_query_timeout: Duration,
  #[serde(default = "default_resource_timeout_ms", with = "millis")]
  pub query_resource_timeout: Duration,
  #[serde(default = "default_graceful_shutdown_ms", with = "millis")]
  pub graceful_shutdown_timeout: Duration,
  #[serde(default)]
  pub logging: LogConfig,
  /// resourceName -> URL template, overridden by `RESTQL_MAPPING_<NAME>`
  /// environment variables (env wins).
  #[serde(default)]
  pub mappings: HashMap<String, String>,
}

impl Default for AppConfig {
  fn default() -> Self {
    AppConfig {
      api_addr: default_api_addr(),
      health_addr: default_health_addr(),
      tenant: default_tenant(),
      global_query_timeout: default_global_timeout_ms(),
      query_resource_timeout: default_resource_timeout_ms(),
      graceful_shutdown_timeout: default_graceful_shutdown_ms(),
      logging: LogConfig::default(),
      mappings: HashMap::new(),
    }
  }
}

fn default_api_addr() -> String {
  "0.0.0.0:9000".to_string()
}
fn default_health_addr() -> String {
  "0.0.0.0:9001".to_string()
}
fn default_tenant() -> String {
  "default".to_string()
}
fn default_global_timeout_ms() -> Duration {
  Duration::from_secs(30)
}
fn default_resource_timeout_ms() -> Duration {
  Duration::from_secs(5)
}
fn default_graceful_shutdown_ms() -> Duration {
  Duration::from_secs(10)
}

/// Env-parsed overlay; field names map to `RESTQL_*` environment
/// variables via `envy`'s default `SCREAMING_SNAKE_CASE` convention.
#[derive(Debug, Default, Deserialize)]
struct EnvOverlay {
  api_addr: Option<String>,
  health_addr: Option<String>,
  tenant: Option<String>,
}

/// Load configuration: built-in defaults, then an optional local
/// `restql.yml` (checked at `./restql.yml` then `$HOME/restql.yml`),
/// then environment variables. Later layers win, matching
/// `internal/plataform/conf/conf.go`'s `Load`.
pub fn load() -> anyhow::Result<AppConfig> {
  let mut cfg = AppConfig::default();

  if let Some(path) = find_local_config_file() {
    let data = std::fs::read_to_string(&path).with_context(|| {
      format!("failed to read config file at {}", path.display())
    })?;
    let local: AppConfig = serde_yaml_ng::from_str(&data)
      .with_context(|| {
        format!("failed to parse config file at {}", path.display())
      })?;
    cfg = local;
  } else {
    tracing::debug!("no local restql.yml found, using defaults");
  }

  let overlay: EnvOverlay = envy::prefixed("RESTQL_")
    .from_env()
    .context("failed to parse RESTQL_* environment variables")?;
  if let Some(addr) = overlay.api_addr {
    cfg.api_addr = addr;
  }
  if let Some(addr) = overlay.health_addr {
    cfg.health_addr = addr;
  }
  if let Some(tenant) = overlay.tenant {
    cfg.tenant = tenant;
  }

  Ok(cfg)
}

fn find_local_config_file() -> Option<PathBuf> {
  let at_root = Path::new(CONFIG_FILE_NAME);
  if at_root.is_file() {
    return Some(at_root.to_path_buf());
  }
  let home = dirs_home()?;
  let at_home = home.join(CONFIG_FILE_NAME);
  at_home.is_file().then_some(at_home)
}

fn dirs_home() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Reads the real process environment; the only production
/// implementation of `domain::EnvSource`, used by the default mapping
/// registry to scan `RESTQL_MAPPING_*`.
pub struct OsEnvSource;

impl domain::EnvSource for OsEnvSource {
  fn get_string(&self, key: &str) -> Option<String> {
    std::env::var(key).ok()
  }

  fn get_all(&self) -> Vec<(String, String)> {
    std::env::vars().collect()
  }
}

mod millis {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub fn serialize<S>(
    value: &Duration,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_u64(value.as_millis() as u64)
  }

  pub fn deserialize<'de, D>(
    deserializer: D,
  ) -> Result<Duration, D::Error>
  where
    D: Deserializer<'de>,
  {
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_sane() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.tenant, "default");
    assert_eq!(cfg.global_query_timeout, Duration::from_secs(30));
    assert!(cfg.query_resource_timeout < cfg.global_query_timeout);
  }

  #[test]
  fn parses_yaml_overlay() {
    let yaml = "api_addr: '127.0.0.1:8080'\ntenant: acme\n";
    let cfg: AppConfig = serde_yaml_ng::from_str(yaml).unwrap();
    assert_eq!(cfg.api_addr, "127.0.0.1:8080");
    assert_eq!(cfg.tenant, "acme");
    // untouched fields still take their defaults
    assert_eq!(cfg.health_addr, default_health_addr());
  }
}
