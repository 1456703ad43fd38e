mod api;
mod config;
mod executor;
mod filter;
mod mapping;
mod multiplex;
mod plugin;
mod resolver;
mod runtime;
mod scheduler;
mod state;

use std::sync::Arc;

use config::app_config;
use runtime::Runtime;
use state::app_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cfg = app_config();
  logger::init(&cfg.logging)?;

  tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting restQL");

  let state = app_state();
  let runtime = Arc::new(Runtime {
    mapping_registry: state.mapping_registry.clone(),
    http_transport: state.http_transport.clone(),
    plugin_host: state.plugin_host.clone(),
    global_query_timeout: cfg.global_query_timeout,
    query_resource_timeout: cfg.query_resource_timeout,
  });

  let api_listener = tokio::net::TcpListener::bind(&cfg.api_addr).await?;
  let health_listener =
    tokio::net::TcpListener::bind(&cfg.health_addr).await?;

  tracing::info!(addr = %cfg.api_addr, "api listening");
  tracing::info!(addr = %cfg.health_addr, "health listening");

  let shutdown = Arc::new(tokio::sync::Notify::new());
  let api_server = axum::serve(
    api_listener,
    api::app(runtime).into_make_service(),
  )
  .with_graceful_shutdown(notified(shutdown.clone()));
  let health_server = axum::serve(
    health_listener,
    api::health_router().into_make_service(),
  )
  .with_graceful_shutdown(notified(shutdown.clone()));

  let serving = tokio::spawn(async move {
    tokio::try_join!(
      async { api_server.await.map_err(anyhow::Error::from) },
      async { health_server.await.map_err(anyhow::Error::from) },
    )
  });

  shutdown_signal().await;
  tracing::info!("starting graceful shutdown");
  shutdown.notify_waiters();

  match tokio::time::timeout(cfg.graceful_shutdown_timeout, serving).await
  {
    Ok(Ok(Ok(_))) => {}
    Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error"),
    Ok(Err(e)) => tracing::error!(error = %e, "server task panicked"),
    Err(_) => {
      tracing::warn!("graceful shutdown did not complete in time")
    }
  }

  Ok(())
}

async fn notified(shutdown: Arc<tokio::sync::Notify>) {
  shutdown.notified().await;
}

async fn shutdown_signal() {
  let ctrl_c = async {
    tokio::signal::ctrl_c()
      .await
      .expect("failed to install ctrl-c handler");
  };

  #[cfg(unix)]
  let terminate = async {
    tokio::signal::unix::signal(
      tokio::signal::unix::SignalKind::terminate(),
    )
    .expect("failed to install sigterm handler")
    .recv()
    .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
