//! # Client Handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::{Client, NewClient};

/// `POST /clients`
pub async fn create_client(
    State(state): State<AppState>,
    Json(new): Json<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    debug!("create_client");
    new.validate()?;

    let client = state.db.clients().insert(&new).await?;
    info!(client_id = %client.id, "Client created");
    Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /clients`
pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.db.clients().list().await?))
}

/// `GET /clients/:id`
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    state
        .db
        .clients()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Client", &id))
}
