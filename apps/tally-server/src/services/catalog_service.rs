//! # Service Catalog Handlers
//!
//! Catalog entries are price-list presets. Invoices copy description and
//! price at creation, so edits and deletes here never reach issued invoices.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::{NewService, Service};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// `?active=true` hides retired services.
    #[serde(default)]
    pub active: bool,
}

/// `POST /services`
pub async fn create_service(
    State(state): State<AppState>,
    Json(new): Json<NewService>,
) -> ApiResult<(StatusCode, Json<Service>)> {
    debug!("create_service");
    new.validate()?;

    let service = state.db.services().insert(&new).await?;
    info!(service_id = %service.id, "Service created");
    Ok((StatusCode::CREATED, Json(service)))
}

/// `GET /services`
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<Vec<Service>>> {
    Ok(Json(state.db.services().list(query.active).await?))
}

/// `GET /services/:id`
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Service>> {
    state
        .db
        .services()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Service", &id))
}

/// `PUT /services/:id`
pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<NewService>,
) -> ApiResult<Json<Service>> {
    changes.validate()?;

    Ok(Json(state.db.services().update(&id, &changes).await?))
}

/// `DELETE /services/:id`
pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    debug!(service_id = %id, "delete_service");
    state.db.services().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
