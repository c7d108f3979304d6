use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_types::{NewUser, User, UserRow};
use crate::db::{with_deadline, StoreError};
use crate::tokens::repo_types::TokenScope;

const EMAIL_KEY: &str = "users_email_key";

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is already registered.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Conditional write on `user.version`; returns the incremented version.
    async fn update(&self, user: &User) -> Result<i32, StoreError>;

    /// Resolves the owner of an unexpired token of `scope` by its hash.
    async fn get_for_token(
        &self,
        scope: TokenScope,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserRepo {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let res = with_deadline(
            self.timeout,
            sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (name, email, password_hash, activated)
                VALUES ($1, $2, $3, $4)
                RETURNING id, created_at, name, email, password_hash, activated, version
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(user.activated)
            .fetch_one(&self.pool),
        )
        .await;

        match res {
            Ok(row) => Ok(User::try_from(row)?),
            Err(e) if e.violates(EMAIL_KEY) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(e),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = with_deadline(
            self.timeout,
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, created_at, name, email, password_hash, activated, version
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::RecordNotFound)?;
        Ok(User::try_from(row)?)
    }

    async fn update(&self, user: &User) -> Result<i32, StoreError> {
        let res = with_deadline(
            self.timeout,
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE users
                SET name = $1, email = $2, password_hash = $3, activated = $4,
                    version = version + 1
                WHERE id = $5 AND version = $6
                RETURNING version
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(user.activated)
            .bind(user.id)
            .bind(user.version)
            .fetch_optional(&self.pool),
        )
        .await;

        match res {
            Ok(Some(version)) => Ok(version),
            Ok(None) => Err(StoreError::EditConflict),
            Err(e) if e.violates(EMAIL_KEY) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(e),
        }
    }

    async fn get_for_token(
        &self,
        scope: TokenScope,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        let row = with_deadline(
            self.timeout,
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT users.id, users.created_at, users.name, users.email,
                       users.password_hash, users.activated, users.version
                FROM users
                INNER JOIN tokens ON users.id = tokens.user_id
                WHERE tokens.hash = $1
                  AND tokens.scope = $2
                  AND tokens.expiry > $3
                "#,
            )
            .bind(token_hash)
            .bind(scope.as_str())
            .bind(now)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::TokenNotFound)?;
        Ok(User::try_from(row)?)
    }
}


#[cfg(test)]
mod tests {
    use super::contract;
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn memory_insert_assigns_identity() {
        contract::insert_assigns_identity(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_duplicate_email_is_distinct() {
        contract::duplicate_email_is_distinct(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_unknown_email_not_found() {
        contract::unknown_email_not_found(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_update_checks_version() {
        contract::update_checks_version(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_update_to_taken_email_is_duplicate() {
        contract::update_to_taken_email_is_duplicate(&MemoryStore::new()).await;
    }

    fn pg(pool: PgPool) -> PgUserRepo {
        PgUserRepo::new(pool, Duration::from_secs(3))
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_insert_assigns_identity(pool: PgPool) {
        contract::insert_assigns_identity(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_duplicate_email_is_distinct(pool: PgPool) {
        contract::duplicate_email_is_distinct(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_unknown_email_not_found(pool: PgPool) {
        contract::unknown_email_not_found(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_update_checks_version(pool: PgPool) {
        contract::update_checks_version(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_update_to_taken_email_is_duplicate(pool: PgPool) {
        contract::update_to_taken_email_is_duplicate(&pg(pool)).await;
    }
}
