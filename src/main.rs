mod cache;
mod config;
mod credential;
mod error;
mod filter;
mod models;
mod origin;
mod pipeline;
mod routes;
mod search;
mod state;
mod transform;
mod upwork;
mod vocabulary;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cache::RedisCache;
use crate::config::Config;
use crate::credential::CredentialService;
use crate::origin::OriginStore;
use crate::pipeline::QueryPipeline;
use crate::state::AppState;

/// The origin store identity is keyed by project id, either given
/// directly or read out of the service account credential file (§6).
fn resolve_project_id(config: &Config) -> anyhow::Result<String> {
    if let Some(id) = &config.firebase_project_id {
        return Ok(id.clone());
    }
    let path = config.firebase_service_account_path.as_ref().ok_or_else(|| {
        anyhow::anyhow!("FIREBASE_PROJECT_ID or FIREBASE_SERVICE_ACCOUNT_PATH must be set")
    })?;
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    value
        .get("project_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("service account file at {path} has no project_id field"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobfeed_query=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("connecting to cache adapter...");
    let cache = Arc::new(RedisCache::connect(&config.redis_url()).await?);

    let project_id = resolve_project_id(&config)?;
    tracing::info!(project_id, "connecting to origin store...");
    let origin = OriginStore::connect(
        &project_id,
        config.firebase_service_account_path.as_deref(),
        config.firestore_collection.clone(),
        config.firestore_job_list_collection.clone(),
    )
    .await?;

    let credentials = Arc::new(CredentialService::new((*cache).clone(), origin.clone()));
    let pipeline = Arc::new(QueryPipeline::new(cache.clone(), origin));

    let state = AppState {
        cache,
        credentials,
        pipeline,
        legacy_api_key: config.api_key.clone(),
    };

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr()).await?;
    tracing::info!("listening on {}", config.listen_addr());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
