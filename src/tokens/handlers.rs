use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use super::dto::{AuthTokenResponse, CreateAuthTokenRequest};
use super::repo_types::TokenScope;
use super::services;
use crate::{
    db::StoreError,
    error::AppError,
    extract::JsonBody,
    state::AppState,
    users::{password::validate_plaintext, services::validate_email},
    validator::Validator,
};

pub fn token_routes() -> Router<AppState> {
    Router::new().route("/v1/tokens/authentication", post(create_authentication_token))
}

#[instrument(skip(state, payload))]
pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<CreateAuthTokenRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut v = Validator::new();
    validate_email(&mut v, &payload.email);
    validate_plaintext(&mut v, &payload.password);
    v.finish()?;

    let user = match state.models.users.get_by_email(&payload.email).await {
        Ok(u) => u,
        Err(StoreError::RecordNotFound) => {
            warn!("token requested for unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    if !user.password.matches_blocking(payload.password).await? {
        warn!(user_id = user.id, "token requested with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = services::issue(
        state.models.tokens.as_ref(),
        user.id,
        state.config.tokens.authentication_ttl(),
        TokenScope::Authentication,
    )
    .await?;

    info!(user_id = user.id, "authentication token issued");
    Ok(Json(AuthTokenResponse {
        authentication_token: token,
    }))
}
