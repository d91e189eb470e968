//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::services::ConversationPipeline;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived, immutable).
    pub config: Arc<Config>,
    /// Chat, community and concern store.
    pub store: Arc<SqliteStore>,
    /// Chat-turn orchestration.
    pub pipeline: Arc<ConversationPipeline>,
}

#[cfg(test)]
pub(crate) async fn test_state(
    provider: Option<Arc<dyn crate::services::CompletionProvider>>,
) -> Arc<AppState> {
    use crate::services::FallbackResponder;

    let mut config = Config::from_lookup(|_| None);
    if provider.is_some() {
        config.cohere_api_key = Some("test-key".into());
    }
    let store = Arc::new(crate::entities::memory_store().await);
    let pipeline = ConversationPipeline::new(Arc::clone(&store), provider, FallbackResponder::seeded(3));
    Arc::new(AppState {
        config: Arc::new(config),
        store,
        pipeline: Arc::new(pipeline),
    })
}
