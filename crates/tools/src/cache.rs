//! Redis-backed manifest persistence (§4.3 "manifests are cached and
//! persisted to Redis so cold restarts do not stall on unreachable modules").

use agentcore_models::ModuleManifest;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

const KEY_PREFIX: &str = "toolcatalog:";

#[derive(Clone)]
pub struct ManifestCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for ManifestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestCache").finish_non_exhaustive()
    }
}

impl ManifestCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    fn key(module_name: &str) -> String {
        format!("{KEY_PREFIX}{module_name}")
    }

    pub async fn store(&self, manifest: &ModuleManifest) -> anyhow::Result<()> {
        let payload = serde_json::to_string(manifest)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(Self::key(&manifest.module_name), payload).await?;
        Ok(())
    }

    /// Loads every cached manifest, used to warm the catalog on startup
    /// before the first live `discover_all()` pass completes.
    pub async fn load_all(&self) -> anyhow::Result<Vec<ModuleManifest>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;
        let mut manifests = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn.get(&key).await?;
            if let Some(raw) = raw {
                match serde_json::from_str::<ModuleManifest>(&raw) {
                    Ok(manifest) => manifests.push(manifest),
                    Err(e) => tracing::warn!(key = %key, error = %e, "dropping unparseable cached manifest"),
                }
            }
        }
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_module() {
        assert_eq!(ManifestCache::key("research"), "toolcatalog:research");
    }
}
