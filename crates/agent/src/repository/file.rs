//! FileRecord persistence (§4.5 step 5, §6.5).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_models::FileRecord;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: Arc<PgPool>,
}

impl FileRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn insert(&self, record: &FileRecord) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO file_records (id, user_id, filename, url, mime_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.filename)
        .bind(&record.url)
        .bind(&record.mime_type)
        .bind(record.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}
