//! Handlers for `/adressen` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kunden_core::{
  address::{Address, NewAddress},
  id::AddressId,
  store::CustomerStore,
};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `POST /adressen` with body `{"strasse", "plz", "ort", "land"}`, all optional
pub async fn create<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Json(body): Json<NewAddress>,
) -> Result<impl IntoResponse, ApiError> {
  let address = app.store.add_address(body).await.map_err(ApiError::from_store)?;

  info!(address_id = %address.id, "address created");
  Ok((StatusCode::CREATED, Json(address)))
}

/// `GET /adressen/{id}`
pub async fn get_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<AddressId>,
) -> Result<Json<Address>, ApiError> {
  let address = app
    .store
    .get_address(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("address {id} not found")))?;
  Ok(Json(address))
}
