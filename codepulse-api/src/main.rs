use std::sync::Arc;

use codepulse_engine::{CheckpointStore, WorkflowEngine};
use codepulse_llm::{LlmClient, LlmConfig};
use codepulse_utils::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logging_guard = codepulse_utils::init_from_env()?;
    let config = EngineConfig::load()?;

    let llm = LlmClient::new(LlmConfig::from_engine_config(&config));
    let store = CheckpointStore::open(&config.store_uri, &config.store_database)?;
    let timeout = std::time::Duration::from_secs(config.workflow_timeout_secs);
    let engine = Arc::new(WorkflowEngine::new(llm, store, timeout));

    let app = codepulse_api::router(codepulse_api::AppState { engine });

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "codepulse-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
