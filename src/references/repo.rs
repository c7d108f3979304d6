use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewReference, Reference};
use crate::db::{with_deadline, StoreError};

#[async_trait]
pub trait ReferenceRepo: Send + Sync {
    /// Id, creation time and the initial version are assigned by the store.
    async fn insert(&self, reference: NewReference) -> Result<Reference, StoreError>;

    async fn get(&self, id: i64) -> Result<Reference, StoreError>;

    /// Writes only when the stored version equals `reference.version`, and
    /// returns the incremented version. A mismatch is an `EditConflict`.
    async fn update(&self, reference: &Reference) -> Result<i32, StoreError>;

    /// Unconditional; no version check.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgReferenceRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgReferenceRepo {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ReferenceRepo for PgReferenceRepo {
    async fn insert(&self, reference: NewReference) -> Result<Reference, StoreError> {
        with_deadline(
            self.timeout,
            sqlx::query_as::<_, Reference>(
                r#"
                INSERT INTO reference_info (name, location)
                VALUES ($1, $2)
                RETURNING id, created_at, name, location, version
                "#,
            )
            .bind(&reference.name)
            .bind(&reference.location)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn get(&self, id: i64) -> Result<Reference, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        with_deadline(
            self.timeout,
            sqlx::query_as::<_, Reference>(
                r#"
                SELECT id, created_at, name, location, version
                FROM reference_info
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::RecordNotFound)
    }

    async fn update(&self, reference: &Reference) -> Result<i32, StoreError> {
        with_deadline(
            self.timeout,
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE reference_info
                SET name = $1, location = $2, version = version + 1
                WHERE id = $3 AND version = $4
                RETURNING version
                "#,
            )
            .bind(&reference.name)
            .bind(&reference.location)
            .bind(reference.id)
            .bind(reference.version)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::EditConflict)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        let res = with_deadline(
            self.timeout,
            sqlx::query(
                r#"
                DELETE FROM reference_info
                WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn memory_insert_then_get() {
        contract::insert_then_get(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_get_rejects_missing_ids() {
        contract::get_rejects_missing_ids(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_update_bumps_version() {
        contract::update_bumps_version(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn memory_stale_update_conflicts() {
        contract::stale_update_conflicts(&MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn memory_concurrent_updates_one_wins() {
        contract::concurrent_updates_one_wins(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn memory_delete_removes() {
        contract::delete_removes(&MemoryStore::new()).await;
    }

    fn pg(pool: PgPool) -> PgReferenceRepo {
        PgReferenceRepo::new(pool, Duration::from_secs(3))
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_insert_then_get(pool: PgPool) {
        contract::insert_then_get(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_get_rejects_missing_ids(pool: PgPool) {
        contract::get_rejects_missing_ids(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_update_bumps_version(pool: PgPool) {
        contract::update_bumps_version(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_stale_update_conflicts(pool: PgPool) {
        contract::stale_update_conflicts(&pg(pool)).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_concurrent_updates_one_wins(pool: PgPool) {
        contract::concurrent_updates_one_wins(Arc::new(pg(pool))).await;
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_delete_removes(pool: PgPool) {
        contract::delete_removes(&pg(pool)).await;
    }
}
