//! Handlers for `/vermittlers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/vermittlers` | Optional `?page=N`; active agents only |
//! | `POST`   | `/vermittlers` | Body: [`AgentWrite`] |
//! | `GET`    | `/vermittlers/{id}` | 404 if unknown or deleted |
//! | `PUT`    | `/vermittlers/{id}` | Body: [`AgentWrite`] |
//! | `DELETE` | `/vermittlers/{id}` | Soft delete; customers keep their agent |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use kunden_core::{
  id::AgentId,
  store::CustomerStore,
  view::{AgentRead, AgentWrite},
};
use tracing::info;

use crate::{AppState, PageParams, error::ApiError};

/// `GET /vermittlers[?page=N]`
pub async fn list<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<AgentRead>>, ApiError> {
  let page = params.resolve(app.config)?;
  let agents = app
    .store
    .list_agents(page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(agents.iter().map(AgentRead::from).collect()))
}

/// `POST /vermittlers`
pub async fn create<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Json(body): Json<AgentWrite>,
) -> Result<impl IntoResponse, ApiError> {
  let agent = app
    .store
    .add_agent(body.into_new_agent()?)
    .await
    .map_err(ApiError::from_store)?;

  info!(agent_id = %agent.id(), "agent created");
  Ok((StatusCode::CREATED, Json(AgentRead::from(&agent))))
}

/// `GET /vermittlers/{id}`
pub async fn get_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<AgentId>,
) -> Result<Json<AgentRead>, ApiError> {
  let agent = app
    .store
    .get_agent(id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|a| !a.is_deleted())
    .ok_or_else(|| ApiError::NotFound(format!("agent {id} not found")))?;
  Ok(Json(AgentRead::from(&agent)))
}

/// `PUT /vermittlers/{id}`
pub async fn update<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<AgentId>,
  Json(body): Json<AgentWrite>,
) -> Result<Json<AgentRead>, ApiError> {
  let agent = app
    .store
    .update_agent(id, body.into_new_agent()?)
    .await
    .map_err(ApiError::from_store)?;

  info!(agent_id = %id, "agent updated");
  Ok(Json(AgentRead::from(&agent)))
}

/// `DELETE /vermittlers/{id}`
pub async fn delete_one<S: CustomerStore>(
  State(app): State<AppState<S>>,
  Path(id): Path<AgentId>,
) -> Result<StatusCode, ApiError> {
  app
    .store
    .delete_agent(id)
    .await
    .map_err(ApiError::from_store)?;

  info!(agent_id = %id, "agent deleted");
  Ok(StatusCode::NO_CONTENT)
}
