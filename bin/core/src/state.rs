use std::sync::{Arc, OnceLock};

use domain::{HttpTransport, MappingRegistry, PluginHost};

use crate::{
  config::app_config, mapping::DefaultMappingRegistry,
  plugin::TaskPoolPluginHost,
};

/// The concrete capability implementations wired up behind the
/// `domain` traits. Swappable in tests by constructing a `Runtime`
/// directly instead of going through this accessor.
#[derive(Clone)]
pub struct AppState {
  pub mapping_registry: Arc<dyn MappingRegistry>,
  pub http_transport: Arc<dyn HttpTransport>,
  pub plugin_host: Arc<dyn PluginHost>,
}

pub fn app_state() -> &'static AppState {
  static STATE: OnceLock<AppState> = OnceLock::new();
  STATE.get_or_init(|| {
    let config = app_config();
    AppState {
      mapping_registry: Arc::new(DefaultMappingRegistry::new(
        config.mappings.clone(),
        Box::new(::config::OsEnvSource),
      )),
      http_transport: Arc::new(
        transport::ReqwestTransport::new()
          .expect("failed to construct the default HTTP transport"),
      ),
      plugin_host: Arc::new(TaskPoolPluginHost::new()),
    }
  })
}
