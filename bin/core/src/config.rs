use std::sync::OnceLock;

use ::config::AppConfig;

/// Process-wide configuration, loaded once on first access and never
/// reloaded. Mirrors the `core_config()` accessor pattern, minus the
/// env-file secret indirection this service has no use for.
pub fn app_config() -> &'static AppConfig {
  static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
  APP_CONFIG.get_or_init(|| match ::config::load() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("FATAL: failed to load configuration | {e:#}");
      std::process::exit(1)
    }
  })
}

pub fn cors_layer() -> tower_http::cors::CorsLayer {
  tower_http::cors::CorsLayer::new()
    .allow_origin(tower_http::cors::Any)
    .allow_methods(tower_http::cors::Any)
    .allow_headers(tower_http::cors::Any)
}
