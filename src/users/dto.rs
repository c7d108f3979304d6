use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for `POST /v1/users`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for `PUT /v1/users/activated`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}
