use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::password::{HashedPassword, PasswordError};

/// Registered user. The password hash is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: HashedPassword,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

/// Fields supplied by the caller on registration; id, timestamps and version
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: HashedPassword,
    pub activated: bool,
}

/// Raw `users` row.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub created_at: OffsetDateTime,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
    pub version: i32,
}

impl TryFrom<UserRow> for User {
    type Error = PasswordError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            created_at: r.created_at,
            name: r.name,
            email: r.email,
            password: HashedPassword::from_phc(r.password_hash)?,
            activated: r.activated,
            version: r.version,
        })
    }
}
