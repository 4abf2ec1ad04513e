//! Handlers for `/users` endpoints.
//!
//! Linking an existing user to a customer goes through
//! `PUT /kunden/{id}/user` (see [`crate::customers::link_user`]).

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kunden_core::{
  id::UserId,
  store::CustomerStore,
  user::{NewUser, User},
};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `POST /users` with body `{"username": "...", "kunde": "<uuid>"?}`
pub async fn create<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  let user = app.store.add_user(body).await.map_err(ApiError::from_store)?;

  info!(user_id = %user.id(), "user created");
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}`
pub async fn get_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
  let user = app
    .store
    .get_user(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}
