//! Handlers for `/kunden` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/kunden` | Optional `?page=N`; active customers only |
//! | `POST`   | `/kunden` | Body: [`CustomerWrite`]; any `id` is ignored |
//! | `GET`    | `/kunden/{id}` | 404 if unknown or deleted |
//! | `PUT`    | `/kunden/{id}` | Body: [`CustomerWrite`] |
//! | `DELETE` | `/kunden/{id}` | Soft delete |
//! | `PUT`    | `/kunden/{id}/user` | Body: `{"user": "<uuid>" \| null}` |
//! | `PUT`    | `/kunden/{id}/adressen/{address_id}` | Attach an address |
//! | `DELETE` | `/kunden/{id}/adressen/{address_id}` | Detach an address |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use kunden_core::{
  customer::Customer,
  id::{AddressId, CustomerId, UserId},
  store::CustomerStore,
  view::{CustomerRead, CustomerWrite},
};
use serde::Deserialize;
use tracing::info;

use crate::{AppState, PageParams, error::ApiError};

fn read(customer: &Customer) -> Result<Json<CustomerRead>, ApiError> {
  Ok(Json(CustomerRead::from_customer(customer)?))
}

/// Deleted customers are reported as missing.
async fn active<S: CustomerStore>(
  store: &S,
  id: CustomerId,
) -> Result<Customer, ApiError> {
  store
    .get_customer(id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|c| !c.is_deleted())
    .ok_or_else(|| ApiError::NotFound(format!("customer {id} not found")))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /kunden[?page=N]`
pub async fn list<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<CustomerRead>>, ApiError> {
  let page = params.resolve(app.config)?;
  let customers = app
    .store
    .list_customers(page)
    .await
    .map_err(ApiError::from_store)?;

  let views = customers
    .iter()
    .map(CustomerRead::from_customer)
    .collect::<kunden_core::Result<Vec<_>>>()?;
  Ok(Json(views))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /kunden`
pub async fn create<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Json(body): Json<CustomerWrite>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body.into_new_customer()?;
  let customer = app
    .store
    .add_customer(input)
    .await
    .map_err(ApiError::from_store)?;

  info!(customer_id = %customer.id(), "customer created");
  Ok((StatusCode::CREATED, read(&customer)?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /kunden/{id}`
pub async fn get_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<CustomerId>,
) -> Result<Json<CustomerRead>, ApiError> {
  read(&active(app.store.as_ref(), id).await?)
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /kunden/{id}`
pub async fn update<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<CustomerId>,
  Json(body): Json<CustomerWrite>,
) -> Result<Json<CustomerRead>, ApiError> {
  let input = body.into_new_customer()?;
  let customer = app
    .store
    .update_customer(id, input)
    .await
    .map_err(ApiError::from_store)?;

  info!(customer_id = %id, "customer updated");
  read(&customer)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /kunden/{id}`
pub async fn delete_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<CustomerId>,
) -> Result<StatusCode, ApiError> {
  app
    .store
    .delete_customer(id)
    .await
    .map_err(ApiError::from_store)?;

  info!(customer_id = %id, "customer deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── User link ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserLink {
  pub user: Option<UserId>,
}

/// `PUT /kunden/{id}/user`
pub async fn link_user<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<CustomerId>,
  Json(body): Json<UserLink>,
) -> Result<Json<CustomerRead>, ApiError> {
  let customer = app
    .store
    .link_user(id, body.user)
    .await
    .map_err(ApiError::from_store)?;

  match body.user {
    Some(user) => info!(customer_id = %id, user_id = %user, "user linked"),
    None => info!(customer_id = %id, "user unlinked"),
  }
  read(&customer)
}

// ─── Addresses ───────────────────────────────────────────────────────────────

/// `PUT /kunden/{id}/adressen/{address_id}`
pub async fn attach_address<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path((id, address)): Path<(CustomerId, AddressId)>,
) -> Result<Json<CustomerRead>, ApiError> {
  let customer = app
    .store
    .attach_address(id, address)
    .await
    .map_err(ApiError::from_store)?;

  info!(customer_id = %id, address_id = %address, "address attached");
  read(&customer)
}

/// `DELETE /kunden/{id}/adressen/{address_id}`
pub async fn detach_address<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path((id, address)): Path<(CustomerId, AddressId)>,
) -> Result<Json<CustomerRead>, ApiError> {
  let customer = app
    .store
    .detach_address(id, address)
    .await
    .map_err(ApiError::from_store)?;

  info!(customer_id = %id, address_id = %address, "address detached");
  read(&customer)
}
