use serde::{Deserialize, Serialize};

use super::repo_types::Reference;

/// Request body for `POST /v1/references`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReferenceRequest {
    pub name: String,
    #[serde(rename = "storage-location")]
    pub location: String,
}

/// Request body for `PATCH /v1/references/:id`. Absent fields keep their
/// stored value; `version`, when given, is the version the edit was based on.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReferenceRequest {
    pub name: Option<String>,
    #[serde(rename = "storage-location")]
    pub location: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub reference: Reference,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
