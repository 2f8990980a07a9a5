use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

pub mod authors;
pub mod books;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

use crate::books::Library;
use crate::config::AppConfig;
use crate::error::Result;

fn init_logging() {
  // `log` records from this crate are bridged into the same subscriber
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Opens the catalog and serves HTTP until Ctrl-C.
///
/// The database is opened and its schema ensured before the listener is
/// bound; if that fails nothing is served.
pub async fn serve(config: AppConfig) -> Result<()> {
  let library = Library::open(&config.database.path)?;
  log::info!("opened database at {}", config.database.path.display());

  let app = routes::router(library);
  let listener = TcpListener::bind(config.server.address).await?;
  log::info!("listening on {}", config.server.address);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  log::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    log::warn!("failed to listen for ctrl-c: {}", err);
    std::future::pending::<()>().await;
  }
}

pub fn run() {
  init_logging();

  let result = AppConfig::load().and_then(|config| {
    tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()?
      .block_on(serve(config))
  });

  if let Err(err) = result {
    log::error!("library server failed: {}", err);
    std::process::exit(1);
  }
}
