//! JSON REST API for the customer registry.
//!
//! Exposes an axum [`Router`] backed by any [`kunden_core::store::CustomerStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", kunden_api::api_router(store.clone(), ApiConfig::default()))
//! ```

pub mod addresses;
pub mod agents;
pub mod customers;
pub mod error;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use kunden_core::store::{CustomerStore, Page};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiConfig {
  /// Page size of the collection endpoints.
  pub items_per_page: usize,
}

impl Default for ApiConfig {
  fn default() -> Self { Self { items_per_page: Page::DEFAULT_SIZE } }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: ApiConfig,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config }
  }
}

/// `?page=N` on collection endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page: Option<usize>,
}

impl PageParams {
  fn resolve(&self, config: ApiConfig) -> Result<Page, ApiError> {
    match self.page {
      Some(0) => Err(ApiError::BadRequest("page numbers start at 1".into())),
      n => Ok(Page::new(n.unwrap_or(1), config.items_per_page)),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, config: ApiConfig) -> Router<()>
where
  S: CustomerStore + 'static,
{
  Router::new()
    // Customers
    .route("/kunden", get(customers::list::<S>).post(customers::create::<S>))
    .route(
      "/kunden/{id}",
      get(customers::get_one::<S>)
        .put(customers::update::<S>)
        .delete(customers::delete_one::<S>),
    )
    .route("/kunden/{id}/user", put(customers::link_user::<S>))
    .route(
      "/kunden/{id}/adressen/{address_id}",
      put(customers::attach_address::<S>).delete(customers::detach_address::<S>),
    )
    // Agents
    .route("/vermittlers", get(agents::list::<S>).post(agents::create::<S>))
    .route(
      "/vermittlers/{id}",
      get(agents::get_one::<S>)
        .put(agents::update::<S>)
        .delete(agents::delete_one::<S>),
    )
    // Users
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Addresses
    .route("/adressen", post(addresses::create::<S>))
    .route("/adressen/{id}", get(addresses::get_one::<S>))
    .with_state(AppState { store, config })
}
