//! HTTP server wiring for the customer registry.
//!
//! Loads [`ServerConfig`], picks a storage backend and serves the
//! `kunden-api` router under `/api`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use kunden_api::{ApiConfig, api_router};
use kunden_core::{
  memory::MemoryStore,
  store::{CustomerStore, Page},
};
use kunden_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `KUNDEN_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  /// SQLite file; the registry is kept in memory when unset.
  #[serde(default)]
  pub store_path:     Option<PathBuf>,
  #[serde(default = "default_items_per_page")]
  pub items_per_page: usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_items_per_page() -> usize { Page::DEFAULT_SIZE }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           default_host(),
      port:           default_port(),
      store_path:     None,
      items_per_page: default_items_per_page(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("KUNDEN"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API nested under `/api`, with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: CustomerStore + 'static,
{
  let api = ApiConfig { items_per_page: config.items_per_page.max(1) };
  Router::new()
    .nest("/api", api_router(store, api))
    .layer(TraceLayer::new_for_http())
}

/// Open the configured backend and serve until the listener fails.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let app = match &config.store_path {
    Some(path) => {
      let path = expand_tilde(path);
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      tracing::info!(?path, "using sqlite store");
      app(Arc::new(store), &config)
    }
    None => {
      tracing::warn!("no store_path configured; records are kept in memory only");
      app(Arc::new(MemoryStore::new()), &config)
    }
  };

  let address = config.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
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
