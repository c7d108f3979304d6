use serde::{Deserialize, Serialize};

use super::repo_types::Token;

/// Request body for `POST /v1/tokens/authentication`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAuthTokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthTokenResponse {
    pub authentication_token: Token,
}
