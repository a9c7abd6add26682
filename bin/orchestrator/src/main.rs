//! Process entry point: loads `AppConfig`, builds the single `AppContext`,
//! and runs the HTTP API and the Scheduler Worker side by side for the
//! life of the process.

use agentcore_config::AppConfig;
use agentcore_runtime::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agentcore_logging::init_tracing()?;

    let config = AppConfig::from_env()?;
    let ctx = AppContext::new(config).await?;

    let scheduler_handle = ctx.spawn_scheduler();

    let listen_addr = ctx.config.listen_addr.clone();
    let router = agentcore_api::build_router(ctx);
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "orchestrator listening");

    tokio::select! {
        result = axum::serve(listener, router) => {
            result?;
        }
        result = scheduler_handle => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "scheduler worker task panicked");
            }
        }
    }

    Ok(())
}
