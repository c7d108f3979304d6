use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::users::password::PasswordError;

/// Failures surfaced at the store boundary. Anything that is not one of the
/// classified kinds stays wrapped in `Database` and ends up as a 500.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    RecordNotFound,
    #[error("edit conflict")]
    EditConflict,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("token not found")]
    TokenNotFound,
    #[error("store call exceeded its {0:?} deadline")]
    Timeout(Duration),
    #[error("corrupt user record: {0}")]
    Corrupt(#[from] PasswordError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn violates(&self, constraint: &str) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => db.constraint() == Some(constraint),
            _ => false,
        }
    }
}

/// Runs a single store call under `limit`. The query future is dropped when the
/// deadline passes, which also releases its connection.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .idle_timeout(config.db.max_idle_time())
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    with_deadline(Duration::from_secs(5), sqlx::query("SELECT 1").execute(&db))
        .await
        .context("ping database")?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_surfaces_timeout() {
        let limit = Duration::from_millis(10);
        let res: Result<(), StoreError> = with_deadline(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(StoreError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn deadline_passes_through_results() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert!(matches!(ok, Ok(7)));

        let err: Result<i32, StoreError> =
            with_deadline(Duration::from_secs(1), async { Err(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(err, Err(StoreError::Database(sqlx::Error::RowNotFound))));
        assert!(!err.unwrap_err().violates("users_email_key"));
    }
}
