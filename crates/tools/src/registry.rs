//! Tool Registry (§4.3), grounded on the teacher's MCP `RegistryManager`
//! pattern (`domain/mcp/src/services/registry/trait_impl.rs`: a cached
//! in-memory catalog behind a trait boundary) and its `reqwest::Client`
//! builder discipline (`domain/mcp/src/services/client/http_client_with_context.rs`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use agentcore_models::{ModuleManifest, PermissionLevel, ToolCallRequest, ToolCallResponse, ToolSpec};
use agentcore_traits::{ToolError, ToolExecutionResult, ToolExecutor, ToolInvocation, ToolOutcome};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::cache::ManifestCache;

const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 120;
/// Known-slow modules get a longer ceiling rather than the default 120s;
/// the spec names the override knob but not its value (§5), so this is a
/// DESIGN.md-recorded choice rather than a spec requirement.
const SLOW_MODULE_EXECUTION_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
struct ModuleEntry {
    manifest: ModuleManifest,
    base_url: String,
}

pub struct ToolRegistry {
    client: Client,
    module_urls: HashMap<String, String>,
    slow_modules: HashSet<String>,
    execution_timeout: Duration,
    modules: RwLock<HashMap<String, ModuleEntry>>,
    tool_index: RwLock<HashMap<String, String>>,
    cache: Option<ManifestCache>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("module_urls", &self.module_urls)
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new(
        module_urls: HashMap<String, String>,
        slow_modules: Vec<String>,
        execution_timeout_secs: u64,
        cache: Option<ManifestCache>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(execution_timeout_secs.max(DEFAULT_EXECUTION_TIMEOUT_SECS)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            module_urls,
            slow_modules: slow_modules.into_iter().collect(),
            execution_timeout: Duration::from_secs(execution_timeout_secs),
            modules: RwLock::new(HashMap::new()),
            tool_index: RwLock::new(HashMap::new()),
            cache,
        }
    }

    fn timeout_for(&self, module_name: &str) -> Duration {
        if self.slow_modules.contains(module_name) {
            Duration::from_secs(SLOW_MODULE_EXECUTION_TIMEOUT_SECS)
        } else {
            self.execution_timeout
        }
    }

    /// Warms the catalog from Redis before the first live discovery pass
    /// completes, so a cold restart doesn't stall on unreachable modules.
    pub async fn warm_from_cache(&self) {
        let Some(cache) = &self.cache else { return };
        match cache.load_all().await {
            Ok(manifests) => {
                for manifest in manifests {
                    self.install_manifest(manifest, None).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to warm tool catalog from redis"),
        }
    }

    async fn install_manifest(&self, manifest: ModuleManifest, base_url: Option<String>) {
        let module_name = manifest.module_name.clone();
        let base_url = base_url.unwrap_or_else(|| {
            self.module_urls.get(&module_name).cloned().unwrap_or_default()
        });

        let mut tool_index = self.tool_index.write().await;
        for tool in &manifest.tools {
            tool_index.insert(tool.name.clone(), module_name.clone());
        }
        drop(tool_index);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&manifest).await {
                tracing::warn!(module = %module_name, error = %e, "failed to persist manifest to redis");
            }
        }

        self.modules.write().await.insert(module_name, ModuleEntry { manifest, base_url });
    }

    /// Fetches `GET {url}/manifest` for every configured module and
    /// atomically replaces that module's catalog entry. Returns the names
    /// of modules that responded successfully.
    pub async fn discover_all(&self) -> Vec<String> {
        let mut discovered = Vec::new();
        for (module_name, url) in self.module_urls.clone() {
            match self.client.get(format!("{url}/manifest")).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ModuleManifest>().await {
                        Ok(manifest) => {
                            self.install_manifest(manifest, Some(url)).await;
                            discovered.push(module_name);
                        }
                        Err(e) => tracing::warn!(module = %module_name, error = %e, "malformed manifest response"),
                    }
                }
                Ok(response) => {
                    tracing::warn!(module = %module_name, status = %response.status(), "manifest fetch returned non-success status");
                }
                Err(e) => {
                    tracing::warn!(module = %module_name, error = %e, "manifest fetch failed");
                }
            }
        }
        discovered
    }

    pub async fn missing_modules(&self) -> Vec<String> {
        let modules = self.modules.read().await;
        self.module_urls
            .keys()
            .filter(|name| !modules.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Union of tools from `allowed_modules` whose `required_permission` is
    /// `<= permission` (ordering: guest < user < admin < owner).
    pub async fn tools_for(&self, permission: PermissionLevel, allowed_modules: &[String]) -> Vec<ToolSpec> {
        let modules = self.modules.read().await;
        allowed_modules
            .iter()
            .filter_map(|name| modules.get(name))
            .flat_map(|entry| entry.manifest.tools.iter())
            .filter(|tool| permission.satisfies(tool.required_permission))
            .cloned()
            .collect()
    }

    async fn owning_module(&self, tool_name: &str) -> Option<(String, String)> {
        let tool_index = self.tool_index.read().await;
        let module_name = tool_index.get(tool_name)?.clone();
        drop(tool_index);
        let modules = self.modules.read().await;
        modules.get(&module_name).map(|entry| (module_name, entry.base_url.clone()))
    }

    async fn execute_once(&self, base_url: &str, invocation: &ToolInvocation) -> Result<ToolCallResponse, String> {
        let request = ToolCallRequest {
            tool_name: invocation.name.clone(),
            arguments: invocation.arguments.clone(),
            user_id: invocation.user_id,
        };

        let response = self
            .client
            .post(format!("{base_url}/execute"))
            .timeout(self.timeout_for(&invocation.name))
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("module returned status {}", response.status()));
        }

        response
            .json::<ToolCallResponse>()
            .await
            .map_err(|e| format!("malformed tool response: {e}"))
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    /// §4.5 step 8: dispatch via Tool Registry; on first failure, retry once.
    async fn execute(&self, invocation: ToolInvocation) -> ToolExecutionResult {
        let Some((_module_name, base_url)) = self.owning_module(&invocation.name).await else {
            return Err(ToolError::Dispatch {
                tool_name: invocation.name.clone(),
                message: format!("unknown tool: {}", invocation.name),
            });
        };

        if let Ok(response) = self.execute_once(&base_url, &invocation).await {
            return finalize(&invocation.name, response);
        }

        match self.execute_once(&base_url, &invocation).await {
            Ok(response) => finalize(&invocation.name, response),
            Err(message) => Err(ToolError::Dispatch { tool_name: invocation.name, message }),
        }
    }
}

fn finalize(tool_name: &str, response: ToolCallResponse) -> ToolExecutionResult {
    if response.success {
        Ok(ToolOutcome { result: response.result })
    } else {
        Err(ToolError::Business {
            tool_name: tool_name.to_string(),
            message: response.error.unwrap_or_else(|| "tool reported failure with no message".to_string()),
        })
    }
}

/// Spawns the background resync loop described in §9 "module discovery with
/// eventual readiness": retries missing modules with increasing delay until
/// all expected modules are present, then exits.
pub fn spawn_resync_loop(registry: Arc<ToolRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = Duration::from_secs(2);
        const MAX_DELAY: Duration = Duration::from_secs(60);

        loop {
            registry.discover_all().await;
            let missing = registry.missing_modules().await;
            if missing.is_empty() {
                tracing::info!("tool registry discovery complete, all modules present");
                break;
            }
            tracing::warn!(missing = ?missing, delay_secs = delay.as_secs(), "modules still missing, retrying discovery");
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> ToolRegistry {
        let mut urls = HashMap::new();
        urls.insert("research".to_string(), "http://localhost:9001".to_string());
        ToolRegistry::new(urls, vec!["slow_mod".to_string()], 120, None)
    }

    #[tokio::test]
    async fn execute_against_unknown_tool_is_classified_permanent() {
        let registry = test_registry();
        let invocation = ToolInvocation {
            tool_use_id: "t1".to_string(),
            name: "ghost.tool".to_string(),
            arguments: serde_json::json!({}),
            user_id: None,
        };
        let result = registry.execute(invocation).await;
        let err = result.expect_err("unknown tool must fail");
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn tools_for_filters_by_permission_and_allowed_modules() {
        let registry = test_registry();
        let manifest = ModuleManifest {
            module_name: "research".to_string(),
            description: "research tools".to_string(),
            tools: vec![
                ToolSpec {
                    name: "research.search".to_string(),
                    description: "search".to_string(),
                    parameters: serde_json::json!({}),
                    required_permission: PermissionLevel::Guest,
                },
                ToolSpec {
                    name: "research.admin_only".to_string(),
                    description: "admin only".to_string(),
                    parameters: serde_json::json!({}),
                    required_permission: PermissionLevel::Admin,
                },
            ],
        };
        registry.install_manifest(manifest, Some("http://localhost:9001".to_string())).await;

        let allowed = vec!["research".to_string()];
        let guest_tools = registry.tools_for(PermissionLevel::Guest, &allowed).await;
        assert_eq!(guest_tools.len(), 1);
        assert_eq!(guest_tools[0].name, "research.search");

        let admin_tools = registry.tools_for(PermissionLevel::Admin, &allowed).await;
        assert_eq!(admin_tools.len(), 2);
    }

    #[tokio::test]
    async fn slow_modules_get_longer_timeout() {
        let registry = test_registry();
        assert_eq!(registry.timeout_for("slow_mod"), Duration::from_secs(SLOW_MODULE_EXECUTION_TIMEOUT_SECS));
        assert_eq!(registry.timeout_for("research"), Duration::from_secs(120));
    }
}
