//! Persistence layer.
//!
//! Each concern gets a store trait ([`ChatStore`], [`PostStore`],
//! [`ConcernStore`]) implemented for the single concrete [`SqliteStore`].
//! Trait methods use `impl Future` in their signatures so handlers stay
//! generic over the backing database without `async-trait`.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microsecond
//! precision, `Z` suffix) so lexical and chronological order agree.

pub mod chat;
pub mod concern;
pub mod dao;
pub mod post;

pub use dao::{
    ChatMessage, CommunityPost, Concern, ConcernFilter, ConcernStatus, NewChatMessage, NewConcern,
    NewPost, NewPostComment, PostComment, Role, CONCERN_CATEGORIES,
};

pub use chat::ChatStore;
pub use concern::ConcernStore;
pub use post::PostStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://wellmind.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database, so pin the
        // pool to one connection that never expires.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Cheap round-trip used by the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}
