//! Thin wrapper around the shared Postgres pool so call sites depend on one
//! small crate instead of wiring `sqlx::PgPool` themselves.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("pool not initialized")]
    NotInitialized,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct DbPool {
    pool: Option<Arc<PgPool>>,
}

impl DbPool {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        tracing::info!("database pool connected");
        Ok(Self { pool: Some(Arc::new(pool)) })
    }

    /// Used by repositories that only need a short-lived borrow.
    pub fn pool_arc(&self) -> Result<Arc<PgPool>, DatabaseError> {
        self.pool.clone().ok_or(DatabaseError::NotInitialized)
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        let pool = self.pool_arc()?;
        sqlx::query("SELECT 1").execute(&*pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_pool_reports_not_initialized() {
        let pool = DbPool { pool: None };
        assert!(matches!(pool.pool_arc(), Err(DatabaseError::NotInitialized)));
    }
}
