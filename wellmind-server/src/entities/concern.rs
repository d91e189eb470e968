use std::future::Future;

use sqlx::{QueryBuilder, Sqlite};

use crate::entities::{
    dao::{Concern, ConcernFilter, ConcernStatus, NewConcern},
    now_timestamp, parse_timestamp, SqliteStore,
};

type ConcernRow = (
    i64,
    String,
    String,
    String,
    Option<i64>,
    Option<String>,
    String,
    i64,
    bool,
    String,
    Option<String>,
);

const CONCERN_COLUMNS: &str = "id, title, content, category, author_id, response, status, upvotes, \
     is_anonymous, created_at, responded_at";

pub trait ConcernStore: Send + Sync + 'static {
    fn create_concern(&self, concern: NewConcern) -> impl Future<Output = Result<Concern, sqlx::Error>> + Send;
    /// Newest first.
    fn list_concerns(&self, filter: ConcernFilter) -> impl Future<Output = Result<Vec<Concern>, sqlx::Error>> + Send;
    fn get_concern(&self, id: i64) -> impl Future<Output = Result<Option<Concern>, sqlx::Error>> + Send;
    /// Attach a staff response and mark the concern `responded`.
    fn respond_to_concern(
        &self,
        id: i64,
        response: &str,
    ) -> impl Future<Output = Result<Option<Concern>, sqlx::Error>> + Send;
    /// Returns the new upvote count, or `None` if the concern does not exist.
    fn upvote_concern(&self, id: i64) -> impl Future<Output = Result<Option<i64>, sqlx::Error>> + Send;
}

impl ConcernStore for SqliteStore {
    async fn create_concern(&self, concern: NewConcern) -> Result<Concern, sqlx::Error> {
        let row: ConcernRow = sqlx::query_as(&format!(
            "INSERT INTO concerns (title, content, category, is_anonymous, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {CONCERN_COLUMNS}"
        ))
        .bind(&concern.title)
        .bind(&concern.content)
        .bind(&concern.category)
        .bind(concern.is_anonymous)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(into_concern(row))
    }

    async fn list_concerns(&self, filter: ConcernFilter) -> Result<Vec<Concern>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {CONCERN_COLUMNS} FROM concerns WHERE 1 = 1"));
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(search) = filter.search {
            query
                .push(" AND LOWER(title) LIKE ")
                .push_bind(like_pattern(&search))
                .push(" ESCAPE '\\'");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<ConcernRow> = query.build_query_as::<ConcernRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(into_concern).collect())
    }

    async fn get_concern(&self, id: i64) -> Result<Option<Concern>, sqlx::Error> {
        let row: Option<ConcernRow> =
            sqlx::query_as(&format!("SELECT {CONCERN_COLUMNS} FROM concerns WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(into_concern))
    }

    async fn respond_to_concern(&self, id: i64, response: &str) -> Result<Option<Concern>, sqlx::Error> {
        let row: Option<ConcernRow> = sqlx::query_as(&format!(
            "UPDATE concerns SET response = ?2, status = ?3, responded_at = ?4 \
             WHERE id = ?1 RETURNING {CONCERN_COLUMNS}"
        ))
        .bind(id)
        .bind(response)
        .bind(ConcernStatus::Responded.as_ref())
        .bind(now_timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_concern))
    }

    async fn upvote_concern(&self, id: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("UPDATE concerns SET upvotes = upvotes + 1 WHERE id = ?1 RETURNING upvotes")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(upvotes,)| upvotes))
    }
}

/// Case-insensitive substring pattern with `%`, `_` and `\` matched literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn into_concern(
    (
        id,
        title,
        content,
        category,
        author_id,
        response,
        status,
        upvotes,
        is_anonymous,
        created_at,
        responded_at,
    ): ConcernRow,
) -> Concern {
    Concern {
        id,
        title,
        content,
        category,
        author_id,
        response,
        status: status.parse().unwrap_or_else(|_| {
            tracing::warn!(id, raw = %status, "unknown concern status; treating as open");
            ConcernStatus::Open
        }),
        upvotes,
        is_anonymous,
        created_at: parse_timestamp(&created_at, "concerns.created_at"),
        responded_at: responded_at.map(|raw| parse_timestamp(&raw, "concerns.responded_at")),
    }
}
