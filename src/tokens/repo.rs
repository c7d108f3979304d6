use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Token, TokenScope};
use crate::db::{with_deadline, StoreError};

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn insert(&self, token: &Token) -> Result<(), StoreError>;

    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64)
        -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgTokenRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgTokenRepo {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl TokenRepo for PgTokenRepo {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        with_deadline(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO tokens (hash, user_id, expiry, scope)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(token.hash.as_slice())
            .bind(token.user_id)
            .bind(token.expiry)
            .bind(token.scope.as_str())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<(), StoreError> {
        with_deadline(
            self.timeout,
            sqlx::query(
                r#"
                DELETE FROM tokens
                WHERE scope = $1 AND user_id = $2
                "#,
            )
            .bind(scope.as_str())
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
