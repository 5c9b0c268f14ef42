use std::sync::Arc;

use axum::extract::FromRef;

use crate::cache::RedisCache;
use crate::credential::CredentialService;
use crate::pipeline::QueryPipeline;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RedisCache>,
    pub credentials: Arc<CredentialService<RedisCache>>,
    pub pipeline: Arc<QueryPipeline<RedisCache>>,
    /// A single static key that bypasses the credential service entirely
    /// (§9). `None` disables the bypass.
    pub legacy_api_key: Option<String>,
}

impl FromRef<AppState> for Arc<CredentialService<RedisCache>> {
    fn from_ref(state: &AppState) -> Self {
        state.credentials.clone()
    }
}

impl FromRef<AppState> for Option<String> {
    fn from_ref(state: &AppState) -> Self {
        state.legacy_api_key.clone()
    }
}
