use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::identity::Identity;
use crate::{
    db::StoreError,
    error::AppError,
    permissions::repo::PermissionRepo,
    state::AppState,
    tokens::{repo_types::TokenScope, services},
    validator::Validator,
};

/// Resolves the bearer token (if any) into an [`Identity`] and attaches it to
/// the request. Rejections carry `Vary: Authorization` too.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = resolve_identity(&state, req.headers()).await;
    let mut res = match resolved {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    };
    res.headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    res
}

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };

    let token = bearer_token(value).ok_or_else(|| {
        warn!("malformed Authorization header");
        AppError::InvalidAuthToken
    })?;

    match services::resolve(state.models.users.as_ref(), token, TokenScope::Authentication).await
    {
        Ok(user) => {
            debug!(user_id = user.id, "request authenticated");
            Ok(Identity::Authenticated(user))
        }
        Err(StoreError::TokenNotFound) => {
            warn!("unknown or expired authentication token");
            Err(AppError::InvalidAuthToken)
        }
        Err(e) => Err(e.into()),
    }
}

/// Extracts `<token>` from `Bearer <token>` when the token is well formed.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let token = value.to_str().ok()?.strip_prefix("Bearer ")?;
    let mut v = Validator::new();
    services::validate_plaintext(&mut v, token);
    v.valid().then_some(token)
}

/// State for [`require_permission`]: the permission store plus the code a
/// route requires.
#[derive(Clone)]
pub struct PermissionGate {
    permissions: Arc<dyn PermissionRepo>,
    code: &'static str,
}

impl PermissionGate {
    pub fn new(state: &AppState, code: &'static str) -> Self {
        Self {
            permissions: state.models.permissions.clone(),
            code,
        }
    }
}

/// Rejects anonymous, inactive and unprivileged callers. Permissions are looked
/// up on every request.
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    identity: Identity,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = identity.user().ok_or(AppError::AuthenticationRequired)?;

    if !user.activated {
        return Err(AppError::InactiveAccount);
    }

    let permissions = gate.permissions.get_all_for_user(user.id).await?;
    if !permissions.includes(gate.code) {
        warn!(user_id = user.id, code = gate.code, "permission denied");
        return Err(AppError::NotPermitted);
    }

    Ok(next.run(req).await)
}
