//! Conversation pipeline.
//!
//! One call to [`ConversationPipeline::handle_turn`] runs a full chat turn:
//!
//! 1. persist the inbound `user` turn;
//! 2. if a provider is configured, load the last [`CONTEXT_TURNS`] turns of
//!    the session (the one just written included) and ask the provider for
//!    a reply;
//! 3. on no reply, classify the message with the [`FallbackResponder`];
//! 4. append the emergency notice when the message is high-risk and the
//!    reply names neither support line;
//! 5. persist the outbound `assistant` turn;
//! 6. return the reply.
//!
//! Provider and context-retrieval failures are absorbed here.  Store writes
//! are not wrapped in one transaction: the provider call sits between them,
//! so a crash after step 1 can leave a `user` turn without its answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{ChatStore, NewChatMessage, Role, SqliteStore};
use crate::services::fallback::{FallbackResponder, EMERGENCY_NUMBER, SUPPORT_PHONE};
use crate::services::provider::{CompletionProvider, ContextTurn};

/// How many prior turns are sent to the provider as context.
pub const CONTEXT_TURNS: i64 = 6;

/// Keywords that trigger the emergency notice.
pub const HIGH_RISK_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "harm myself",
    "emergency",
    "urgent",
];

pub const EMERGENCY_NOTICE: &str = "🚨 EMERGENCY: If you're having thoughts of harming yourself, please call our emergency line immediately: +254759226354 or dial 999.";

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Provider,
    Fallback,
    ErrorFallback,
}

/// Result of one chat turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: ReplySource,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("message cannot be empty")]
    InvalidInput,

    #[error("failed to persist turn for session {session_id}: {source}")]
    Persistence {
        session_id: String,
        #[source]
        source: sqlx::Error,
    },
}

pub struct ConversationPipeline<S = SqliteStore> {
    store: Arc<S>,
    provider: Option<Arc<dyn CompletionProvider>>,
    fallback: FallbackResponder,
}

impl<S: ChatStore> ConversationPipeline<S> {
    /// `provider` is `None` when no credential is configured.
    pub fn new(
        store: Arc<S>,
        provider: Option<Arc<dyn CompletionProvider>>,
        fallback: FallbackResponder,
    ) -> Self {
        Self { store, provider, fallback }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn handle_turn(
        &self,
        message: &str,
        session_id: Option<String>,
    ) -> Result<TurnOutcome, PipelineError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::InvalidInput);
        }
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.store
            .append_message(NewChatMessage {
                session_id: session_id.clone(),
                role: Role::User,
                content: message.to_owned(),
            })
            .await
            .map_err(|source| PipelineError::Persistence { session_id: session_id.clone(), source })?;

        let (candidate, source) = match self.ask_provider(&session_id, message).await {
            Some(reply) => (reply, ReplySource::Provider),
            None => {
                info!(%session_id, "using fallback reply");
                (self.fallback.classify(message).to_owned(), ReplySource::Fallback)
            }
        };
        let reply = augment_for_emergency(message, candidate);

        self.store
            .append_message(NewChatMessage {
                session_id: session_id.clone(),
                role: Role::Assistant,
                content: reply.clone(),
            })
            .await
            .map_err(|source| PipelineError::Persistence { session_id: session_id.clone(), source })?;

        Ok(TurnOutcome { reply, session_id, timestamp: Utc::now(), source })
    }

    /// Generic reply for turns that failed after validation.
    pub fn error_fallback(&self, session_id: Option<String>) -> TurnOutcome {
        TurnOutcome {
            reply: self.fallback.generic().to_owned(),
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: Utc::now(),
            source: ReplySource::ErrorFallback,
        }
    }

    async fn ask_provider(&self, session_id: &str, message: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;

        let mut recent = match self
            .store
            .recent_messages(session_id, CONTEXT_TURNS)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%session_id, error = %e, "failed to load conversation context");
                return None;
            }
        };
        recent.reverse();
        let context: Vec<ContextTurn> = recent
            .into_iter()
            .map(|m| ContextTurn { speaker: m.role, text: m.content })
            .collect();

        provider
            .complete(message, &context)
            .await
            .filter(|reply| !reply.trim().is_empty())
    }
}

/// Append [`EMERGENCY_NOTICE`] when `message` is high-risk and `reply` does
/// not already name a support line.
pub fn augment_for_emergency(message: &str, reply: String) -> String {
    let lower = message.to_lowercase();
    let high_risk = HIGH_RISK_KEYWORDS.iter().any(|k| lower.contains(k));
    if !high_risk || reply.contains(SUPPORT_PHONE) || reply.contains(EMERGENCY_NUMBER) {
        return reply;
    }
    format!("{reply}\n\n{EMERGENCY_NOTICE}")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tracing_test::traced_test;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::entities::{memory_store, ChatMessage};
    use crate::services::provider::{CohereClient, ProviderConfig};

    /// Chat store backed by SQLite that can be told to fail.
    pub(crate) struct FlakyStore {
        inner: SqliteStore,
        fail_recent: bool,
        /// Appends that succeed before every later one fails.
        appends_before_failure: Option<usize>,
        appends: AtomicUsize,
    }

    impl FlakyStore {
        pub(crate) async fn new(fail_recent: bool, appends_before_failure: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                inner: memory_store().await,
                fail_recent,
                appends_before_failure,
                appends: AtomicUsize::new(0),
            })
        }
    }

    impl ChatStore for FlakyStore {
        async fn append_message(&self, msg: NewChatMessage) -> Result<ChatMessage, sqlx::Error> {
            let n = self.appends.fetch_add(1, Ordering::SeqCst);
            if self.appends_before_failure.is_some_and(|limit| n >= limit) {
                return Err(sqlx::Error::PoolClosed);
            }
            self.inner.append_message(msg).await
        }

        async fn list_messages(&self, session_id: &str, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
            self.inner.list_messages(session_id, limit).await
        }

        async fn recent_messages(&self, session_id: &str, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
            if self.fail_recent {
                return Err(sqlx::Error::PoolClosed);
            }
            self.inner.recent_messages(session_id, limit).await
        }
    }

    /// Provider that answers from a script and records what it was asked.
    struct ScriptedProvider {
        reply: Option<String>,
        calls: Mutex<Vec<(String, Vec<ContextTurn>)>>,
    }

    impl ScriptedProvider {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self { reply: reply.map(str::to_owned), calls: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<(String, Vec<ContextTurn>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, message: &str, context: &[ContextTurn]) -> Option<String> {
            self.calls.lock().unwrap().push((message.to_owned(), context.to_vec()));
            self.reply.clone()
        }
    }

    async fn pipeline(provider: Option<Arc<dyn CompletionProvider>>) -> (ConversationPipeline, Arc<SqliteStore>) {
        let store = Arc::new(memory_store().await);
        let p = ConversationPipeline::new(Arc::clone(&store), provider, FallbackResponder::seeded(7));
        (p, store)
    }

    #[tokio::test]
    async fn anxious_message_without_credential_uses_fallback() {
        let (p, store) = pipeline(None).await;
        let out = p
            .handle_turn("I feel very anxious today", Some("s1".into()))
            .await
            .unwrap();

        assert_eq!(out.source, ReplySource::Fallback);
        assert_eq!(out.session_id, "s1");
        assert!(out.reply.contains("breathing exercise"));
        assert!(out.reply.contains(SUPPORT_PHONE));

        let rows = store.list_messages("s1", 100).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, Role::User);
        assert_eq!(rows[0].content, "I feel very anxious today");
        assert_eq!(rows[1].role, Role::Assistant);
        assert_eq!(rows[1].content, out.reply);
    }

    #[tokio::test]
    async fn exhausted_provider_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "" })))
            .expect(2)
            .mount(&server)
            .await;
        let client = CohereClient::new(ProviderConfig {
            api_key: "k".into(),
            base_url: server.uri(),
            models: vec!["m1".into(), "m2".into()],
            timeout: Duration::from_secs(1),
            ..ProviderConfig::default()
        })
        .unwrap();

        let (p, store) = pipeline(Some(Arc::new(client))).await;
        let out = p
            .handle_turn("I feel very anxious today", Some("s2".into()))
            .await
            .unwrap();

        assert_eq!(out.source, ReplySource::Fallback);
        assert!(out.reply.contains("breathing exercise"));
        assert_eq!(store.list_messages("s2", 100).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn self_harm_message_gets_emergency_reply() {
        let (p, _store) = pipeline(None).await;
        let out = p.handle_turn("I want to kill myself", None).await.unwrap();
        assert!(out.reply.starts_with("🚨 EMERGENCY"));
        assert!(out.reply.contains(SUPPORT_PHONE));
        assert!(out.reply.contains("999"));
    }

    #[tokio::test]
    async fn context_includes_the_current_turn() {
        let provider = ScriptedProvider::new(Some("I'm here with you."));
        let (p, _store) = pipeline(Some(provider.clone())).await;

        let first = p.handle_turn("hello", Some("s4".into())).await.unwrap();
        assert_eq!(first.source, ReplySource::Provider);
        p.handle_turn("still there?", Some("s4".into())).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, vec![ContextTurn { speaker: Role::User, text: "hello".into() }]);
        assert_eq!(calls[1].0, "still there?");
        assert_eq!(
            calls[1].1,
            vec![
                ContextTurn { speaker: Role::User, text: "hello".into() },
                ContextTurn { speaker: Role::Assistant, text: "I'm here with you.".into() },
                ContextTurn { speaker: Role::User, text: "still there?".into() },
            ]
        );
    }

    #[tokio::test]
    async fn context_is_capped_and_chronological() {
        let provider = ScriptedProvider::new(Some("ok"));
        let (p, _store) = pipeline(Some(provider.clone())).await;
        for i in 0..5 {
            p.handle_turn(&format!("turn {i}"), Some("s5".into())).await.unwrap();
        }
        let calls = provider.calls();
        let last = &calls[4].1;
        assert_eq!(last.len(), CONTEXT_TURNS as usize);
        assert_eq!(last[0].text, "ok");
        assert_eq!(last[1].text, "turn 2");
        assert_eq!(last[5], ContextTurn { speaker: Role::User, text: "turn 4".into() });
    }

    #[tokio::test]
    async fn provider_reply_for_high_risk_message_is_augmented() {
        let provider = ScriptedProvider::new(Some("Please talk to someone you trust."));
        let (p, _store) = pipeline(Some(provider)).await;
        let out = p.handle_turn("this is urgent, I want to die", None).await.unwrap();
        assert_eq!(out.source, ReplySource::Provider);
        assert!(out.reply.starts_with("Please talk to someone you trust."));
        assert!(out.reply.ends_with(EMERGENCY_NOTICE));
    }

    #[test]
    fn reply_naming_a_support_line_is_left_alone() {
        let reply = "Call 999 now.".to_owned();
        assert_eq!(augment_for_emergency("suicide", reply.clone()), reply);
        let calm = "Have a good day.".to_owned();
        assert_eq!(augment_for_emergency("hello", calm.clone()), calm);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_writes() {
        let provider = ScriptedProvider::new(Some("never"));
        let (p, store) = pipeline(Some(provider.clone())).await;
        for blank in ["", "   ", "\n\t"] {
            let err = p.handle_turn(blank, Some("s6".into())).await.unwrap_err();
            assert!(matches!(err, PipelineError::InvalidInput));
        }
        assert!(store.list_messages("s6", 100).await.unwrap().is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_session_gets_a_fresh_id() {
        let (p, store) = pipeline(None).await;
        let a = p.handle_turn("hi", None).await.unwrap();
        let b = p.handle_turn("hi", Some("  ".into())).await.unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert!(Uuid::parse_str(&a.session_id).is_ok());
        assert_eq!(store.list_messages(&a.session_id, 100).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn inbound_write_failure_skips_provider() {
        let provider = ScriptedProvider::new(Some("never"));
        let (p, store) = pipeline(Some(provider.clone())).await;
        store.close().await;

        let err = p.handle_turn("hello", Some("s7".into())).await.unwrap_err();
        match err {
            PipelineError::Persistence { session_id, .. } => assert_eq!(session_id, "s7"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(provider.calls().is_empty());
        assert!(!logs_contain("using fallback reply"));
    }

    #[tokio::test]
    #[traced_test]
    async fn context_failure_degrades_to_fallback() {
        let provider = ScriptedProvider::new(Some("never"));
        let store = FlakyStore::new(true, None).await;
        let p = ConversationPipeline::new(Arc::clone(&store), Some(provider.clone()), FallbackResponder::seeded(7));

        let out = p.handle_turn("I feel very anxious today", Some("s8".into())).await.unwrap();
        assert_eq!(out.source, ReplySource::Fallback);
        assert!(out.reply.contains("breathing exercise"));
        assert!(provider.calls().is_empty());
        assert_eq!(store.list_messages("s8", 100).await.unwrap().len(), 2);
        assert!(logs_contain("failed to load conversation context"));
    }

    #[tokio::test]
    async fn outbound_write_failure_is_a_persistence_error() {
        let provider = ScriptedProvider::new(Some("I'm listening."));
        let store = FlakyStore::new(false, Some(1)).await;
        let p = ConversationPipeline::new(Arc::clone(&store), Some(provider.clone()), FallbackResponder::seeded(7));

        let err = p.handle_turn("hello", Some("s9".into())).await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { ref session_id, .. } if session_id == "s9"));
        assert_eq!(provider.calls().len(), 1);
        let rows = store.list_messages("s9", 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, Role::User);
    }

    #[tokio::test]
    async fn error_fallback_keeps_or_mints_session() {
        let (p, _store) = pipeline(None).await;
        let kept = p.error_fallback(Some("abc".into()));
        assert_eq!(kept.session_id, "abc");
        assert_eq!(kept.source, ReplySource::ErrorFallback);
        assert!(kept.reply.contains(SUPPORT_PHONE));
        assert!(Uuid::parse_str(&p.error_fallback(None).session_id).is_ok());
    }
}
