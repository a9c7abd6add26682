//! Persona persistence (§3, §4.5 step 3). `allowed_modules` is stored as a
//! JSON array column; the relational schema itself is an implementation
//! detail the spec leaves unspecified (§6.5).

use std::collections::BTreeSet;
use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_models::{Persona, PersonaBinding};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct PersonaRepository {
    pool: Arc<PgPool>,
}

impl PersonaRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn list_all(&self) -> anyhow::Result<Vec<Persona>> {
        let rows = sqlx::query(
            r"
            SELECT id, system_prompt, allowed_modules, default_model, max_tokens_per_request,
                   is_default, binding_platform, binding_server_id
            FROM personas
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        rows.into_iter().map(Self::from_row).collect()
    }

    fn from_row(row: sqlx::postgres::PgRow) -> anyhow::Result<Persona> {
        let allowed_modules_json: serde_json::Value = row.try_get("allowed_modules")?;
        let allowed_modules: BTreeSet<String> = serde_json::from_value(allowed_modules_json).unwrap_or_default();

        let binding_platform: Option<String> = row.try_get("binding_platform")?;
        let binding_server_id: Option<String> = row.try_get("binding_server_id")?;
        let binding = match (binding_platform, binding_server_id) {
            (Some(platform), Some(platform_server_id)) => Some(PersonaBinding { platform, platform_server_id }),
            _ => None,
        };

        Ok(Persona {
            id: row.try_get("id")?,
            system_prompt: row.try_get("system_prompt")?,
            allowed_modules,
            default_model: row.try_get("default_model")?,
            max_tokens_per_request: row.try_get::<Option<i64>, _>("max_tokens_per_request")?.map(|v| v as u32),
            is_default: row.try_get("is_default")?,
            binding,
        })
    }
}
