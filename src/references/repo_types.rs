use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Row of `reference_info`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reference {
    pub id: i64,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
    pub name: String,
    #[serde(rename = "storage-location")]
    pub location: String,
    pub version: i32,
}

#[derive(Debug, Clone)]
pub struct NewReference {
    pub name: String,
    pub location: String,
}
