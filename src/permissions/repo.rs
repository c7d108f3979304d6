use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::Permissions;
use crate::db::{with_deadline, StoreError};

#[async_trait]
pub trait PermissionRepo: Send + Sync {
    /// Empty set when nothing has been granted.
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError>;

    /// Grants every code that exists in the master `permissions` table; unknown
    /// codes are skipped and re-granting is a no-op.
    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgPermissionRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgPermissionRepo {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl PermissionRepo for PgPermissionRepo {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        let codes = with_deadline(
            self.timeout,
            sqlx::query_scalar::<_, String>(
                r#"
                SELECT permissions.code
                FROM permissions
                INNER JOIN users_permissions
                    ON users_permissions.permission_id = permissions.id
                INNER JOIN users
                    ON users_permissions.user_id = users.id
                WHERE users.id = $1
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(codes.into_iter().collect())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError> {
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        with_deadline(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO users_permissions (user_id, permission_id)
                SELECT $1, permissions.id
                FROM permissions
                WHERE permissions.code = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(codes)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::users::repo::{contract::new_user, PgUserRepo, UserRepo};

    #[tokio::test]
    async fn memory_grants_known_codes() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice@example.com")).await;
        contract::grants_known_codes(&store, user.id).await;
    }

    #[tokio::test]
    async fn memory_unknown_codes_are_skipped() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice@example.com")).await;
        contract::unknown_codes_are_skipped(&store, user.id).await;
    }

    #[tokio::test]
    async fn memory_permissions_are_per_user() {
        let store = MemoryStore::new();
        let alice = store.insert_user(new_user("alice@example.com")).await;
        let bob = store.insert_user(new_user("bob@example.com")).await;
        store
            .add_for_user(alice.id, &[crate::permissions::repo_types::REFERENCE_WRITE])
            .await
            .unwrap();
        assert!(store.get_all_for_user(bob.id).await.unwrap().is_empty());
    }

    async fn pg_user(pool: &PgPool) -> i64 {
        let users = PgUserRepo::new(pool.clone(), Duration::from_secs(3));
        users.insert(new_user("alice@example.com")).await.unwrap().id
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_grants_known_codes(pool: PgPool) {
        let user_id = pg_user(&pool).await;
        let repo = PgPermissionRepo::new(pool, Duration::from_secs(3));
        contract::grants_known_codes(&repo, user_id).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_unknown_codes_are_skipped(pool: PgPool) {
        let user_id = pg_user(&pool).await;
        let repo = PgPermissionRepo::new(pool, Duration::from_secs(3));
        contract::unknown_codes_are_skipped(&repo, user_id).await;
    }
}
