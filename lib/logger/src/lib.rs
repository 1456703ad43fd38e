use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
  Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Whether stdout output is human-oriented or line-delimited JSON (fit
/// for shipping to a log collector), or disabled entirely.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StdioLogMode {
  #[default]
  Standard,
  Json,
  None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
  pub stdio: StdioLogMode,
  pub level: String,
  /// Multi-line, indented output; ignored when `stdio` is `Json`.
  pub pretty: bool,
  pub ansi: bool,
  /// Include the module path in each line.
  pub location: bool,
}

impl Default for LogConfig {
  fn default() -> Self {
    LogConfig {
      stdio: StdioLogMode::Standard,
      level: "info".to_string(),
      pretty: false,
      ansi: true,
      location: false,
    }
  }
}

/// Initialize the global `tracing` subscriber from `config`. Call once
/// at process startup, before any other `tracing` call.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
  let level_filter: tracing::level_filters::LevelFilter = config
    .level
    .parse::<tracing::Level>()
    .unwrap_or(tracing::Level::INFO)
    .into();

  let registry = Registry::default().with(level_filter);

  match (config.stdio, config.pretty) {
    (StdioLogMode::Standard, true) => registry
      .with(
        tracing_subscriber::fmt::layer()
          .pretty()
          .with_file(false)
          .with_line_number(false)
          .with_target(config.location)
          .with_ansi(config.ansi),
      )
      .try_init(),
    (StdioLogMode::Standard, false) => registry
      .with(
        tracing_subscriber::fmt::layer()
          .with_file(false)
          .with_line_number(false)
          .with_target(config.location)
          .with_ansi(config.ansi),
      )
      .try_init(),
    (StdioLogMode::Json, _) => {
      registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    }
    (StdioLogMode::None, _) => Ok(()),
  }
  .context("failed to init logger")
}
