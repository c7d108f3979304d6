use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreateReferenceRequest, MessageResponse, ReferenceResponse, UpdateReferenceRequest};
use super::repo_types::NewReference;
use super::services::{apply_update, validate_reference};
use crate::{
    auth::middleware::{require_permission, PermissionGate},
    error::AppError,
    extract::JsonBody,
    permissions::repo_types::{REFERENCE_READ, REFERENCE_WRITE},
    state::AppState,
    validator::Validator,
};

// --- public routers ---

pub fn read_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/references/:id", get(show_reference))
        .route_layer(middleware::from_fn_with_state(
            PermissionGate::new(state, REFERENCE_READ),
            require_permission,
        ))
}

pub fn write_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/references", post(create_reference))
        .route(
            "/v1/references/:id",
            patch(update_reference).delete(delete_reference),
        )
        .route_layer(middleware::from_fn_with_state(
            PermissionGate::new(state, REFERENCE_WRITE),
            require_permission,
        ))
}

// --- handlers ---

#[instrument(skip(state, payload))]
pub async fn create_reference(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateReferenceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::new();
    validate_reference(&mut v, &payload.name, &payload.location);
    v.finish()?;

    let reference = state
        .models
        .references
        .insert(NewReference {
            name: payload.name,
            location: payload.location,
        })
        .await?;

    info!(reference_id = reference.id, "reference created");
    let location = format!("/v1/references/{}", reference.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ReferenceResponse { reference }),
    ))
}

#[instrument(skip(state))]
pub async fn show_reference(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ReferenceResponse>, AppError> {
    let id = read_id_param(&raw_id)?;
    let reference = state.models.references.get(id).await?;
    Ok(Json(ReferenceResponse { reference }))
}

#[instrument(skip(state, payload))]
pub async fn update_reference(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateReferenceRequest>,
) -> Result<Json<ReferenceResponse>, AppError> {
    let id = read_id_param(&raw_id)?;
    let mut reference = state.models.references.get(id).await?;

    apply_update(&mut reference, payload);

    let mut v = Validator::new();
    validate_reference(&mut v, &reference.name, &reference.location);
    v.finish()?;

    reference.version = state.models.references.update(&reference).await?;

    info!(reference_id = id, version = reference.version, "reference updated");
    Ok(Json(ReferenceResponse { reference }))
}

#[instrument(skip(state))]
pub async fn delete_reference(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = read_id_param(&raw_id)?;
    state.models.references.delete(id).await?;

    info!(reference_id = id, "reference deleted");
    Ok(Json(MessageResponse {
        message: "reference successfully deleted",
    }))
}

/// Anything that is not a positive integer is treated as a missing record.
fn read_id_param(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}
