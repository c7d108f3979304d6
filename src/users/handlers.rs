use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{ActivateRequest, RegisterRequest, UserResponse};
use super::password::{HashedPassword, PlaintextPassword};
use super::repo_types::NewUser;
use super::services::{validate_email, validate_name};
use crate::{
    db::StoreError,
    error::AppError,
    extract::JsonBody,
    mailer::WelcomeEmail,
    permissions::repo_types::REFERENCE_READ,
    state::AppState,
    tokens::{self, repo_types::TokenScope},
    validator::Validator,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(register))
        .route("/v1/users/activated", put(activate))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    let plain = PlaintextPassword::new(payload.password);

    let mut v = Validator::new();
    validate_name(&mut v, &payload.name);
    validate_email(&mut v, &payload.email);
    plain.validate(&mut v);
    v.finish()?;

    let password = HashedPassword::set_blocking(plain, state.config.password.clone()).await?;

    let user = match state
        .models
        .users
        .insert(NewUser {
            name: payload.name,
            email: payload.email,
            password,
            activated: false,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!("email already registered");
            return Err(StoreError::DuplicateEmail.into());
        }
        Err(e) => return Err(e.into()),
    };

    state
        .models
        .permissions
        .add_for_user(user.id, &[REFERENCE_READ])
        .await?;

    let token = tokens::services::issue(
        state.models.tokens.as_ref(),
        user.id,
        state.config.tokens.activation_ttl(),
        TokenScope::Activation,
    )
    .await?;

    let mailer = state.mailer.clone();
    let recipient = user.email.clone();
    let email = WelcomeEmail {
        user_id: user.id,
        name: user.name.clone(),
        activation_token: token.plaintext,
        activation_ttl_hours: state.config.tokens.activation_ttl_hours,
    };
    state.tasks.spawn(async move {
        if let Err(e) = mailer.send_welcome(&recipient, &email).await {
            error!(error = ?e, user_id = email.user_id, "welcome email failed");
        }
    });

    info!(user_id = user.id, "user registered");
    Ok((StatusCode::ACCEPTED, Json(UserResponse { user })))
}

#[instrument(skip(state, payload))]
pub async fn activate(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ActivateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut v = Validator::new();
    tokens::services::validate_plaintext(&mut v, &payload.token);
    v.finish()?;

    let mut user = match tokens::services::resolve(
        state.models.users.as_ref(),
        &payload.token,
        TokenScope::Activation,
    )
    .await
    {
        Ok(u) => u,
        Err(StoreError::TokenNotFound) => {
            warn!("unknown or expired activation token");
            return Err(AppError::field("token", "invalid or expired activation token"));
        }
        Err(e) => return Err(e.into()),
    };

    user.activated = true;
    user.version = state.models.users.update(&user).await?;

    state
        .models
        .tokens
        .delete_all_for_user(TokenScope::Activation, user.id)
        .await?;

    info!(user_id = user.id, "user activated");
    Ok(Json(UserResponse { user }))
}
