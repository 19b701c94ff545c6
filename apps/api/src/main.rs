mod analysis;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::gateway::ProviderGateway;
use crate::analysis::pipeline::Pipeline;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{AnalysisStore, JobStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting analyzer v{}", env!("CARGO_PKG_VERSION"));

    // Pick the store backend
    let (analyses, jobs): (Arc<dyn AnalysisStore>, Arc<dyn JobStore>) =
        match &config.database_url {
            Some(url) => {
                let store = PgStore::new(create_pool(url, config.database_max_connections).await?);
                (Arc::new(store.clone()), Arc::new(store))
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
                let store = MemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

    // Initialize LLM client behind the retrying gateway
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.provider.timeout)?;
    let gateway = ProviderGateway::new(Arc::new(llm), config.provider);
    info!(
        "LLM client initialized (model: {}, timeout {}s, {} attempts)",
        llm_client::MODEL,
        config.provider.timeout.as_secs(),
        config.provider.max_attempts
    );

    let state = AppState {
        pipeline: Pipeline::new(gateway, analyses, jobs.clone()),
        jobs,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
