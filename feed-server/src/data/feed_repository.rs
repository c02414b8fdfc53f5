use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error};
use uuid::Uuid;

use crate::data::filters::{push_location_filter, push_thumbnail_filter};
use crate::domain::error::DomainError;
use crate::domain::location::LocationFilter;
use crate::domain::post::FeedRow;
use crate::domain::ranking::score_sql;
use crate::domain::viewer::Viewer;

const FEED_COLUMNS: &str = r#"
    c.id, c.user_id AS author_id, u.username, u.profile_picture_url,
    c.title, c.body, c.location, c.is_in_seattle, c.thumbnail,
    c.is_seeded, c.seed_type, c.seeded_likes_count, c.seeded_comments_count,
    c.news_link, c.created_at, c.updated_at
"#;

/// Whose posts a scored feed draws from.
#[derive(Debug, Clone, Copy)]
pub enum Audience<'a> {
    /// Main feed for an anonymous visitor.
    Anonymous,
    /// Main feed for a signed-in viewer: skips authors they blocked and posts they hid.
    Viewer(&'a Viewer),
    /// Posts by authors the viewer follows, minus blocks in either direction.
    Following(&'a Viewer),
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredFeedQuery<'a> {
    pub page: u32,
    pub per_page: u32,
    pub audience: Audience<'a>,
    pub location: Option<&'a LocationFilter>,
}

impl ScoredFeedQuery<'_> {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// Which posts a recency-ordered feed loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecentScope {
    SeededOnly,
    All,
}

#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// One page ordered by decayed engagement score, plus the unpaginated total.
    async fn fetch_scored(
        &self,
        query: ScoredFeedQuery<'_>,
    ) -> Result<(Vec<FeedRow>, i64), DomainError>;

    /// Every matching post, newest first.
    async fn fetch_recent(
        &self,
        scope: RecentScope,
        location: Option<&LocationFilter>,
    ) -> Result<Vec<FeedRow>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresFeedRepository {
    pool: PgPool,
}

impl PostgresFeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_scored_base(qb: &mut QueryBuilder<'_, Postgres>, query: &ScoredFeedQuery<'_>) {
    qb.push("SELECT ");
    qb.push(FEED_COLUMNS);
    qb.push(", ");
    qb.push(score_sql());
    qb.push(
        r#" AS score
        FROM user_content c
        JOIN users u ON u.id = c.user_id
        LEFT JOIN reactions r ON r.content_id = c.id
        LEFT JOIN comments cm ON cm.content_id = c.id
        LEFT JOIN shares s ON s.content_id = c.id
        WHERE TRUE"#,
    );

    match query.audience {
        Audience::Anonymous => {}
        Audience::Viewer(viewer) => {
            qb.push(" AND NOT (c.user_id = ANY(");
            qb.push_bind(viewer.blocked.iter().copied().collect::<Vec<Uuid>>());
            qb.push("))");
            qb.push(" AND c.id NOT IN (SELECT h.content_id FROM hidden_content h WHERE h.user_id = ");
            qb.push_bind(viewer.id);
            qb.push(")");
        }
        Audience::Following(viewer) => {
            qb.push(" AND c.user_id = ANY(");
            qb.push_bind(viewer.following.iter().copied().collect::<Vec<Uuid>>());
            qb.push(") AND NOT (c.user_id = ANY(");
            qb.push_bind(viewer.excluded_authors());
            qb.push("))");
        }
    }

    push_location_filter(qb, query.location);
    push_thumbnail_filter(qb);
    qb.push(" GROUP BY c.id, u.id");
}

#[async_trait]
impl FeedRepository for PostgresFeedRepository {
    async fn fetch_scored(
        &self,
        query: ScoredFeedQuery<'_>,
    ) -> Result<(Vec<FeedRow>, i64), DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (");
        push_scored_base(&mut count, &query);
        count.push(") AS grouped");
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to count scored feed: {}", e);
                DomainError::from(e)
            })?;

        let mut page = QueryBuilder::<Postgres>::new("");
        push_scored_base(&mut page, &query);
        page.push(" ORDER BY score DESC, c.created_at DESC, c.id LIMIT ");
        page.push_bind(i64::from(query.per_page));
        page.push(" OFFSET ");
        page.push_bind(query.offset());

        let rows = page
            .build_query_as::<FeedRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to fetch scored feed: {}", e);
                DomainError::from(e)
            })?;

        debug!(rows = rows.len(), total, "scored feed fetched");
        Ok((rows, total))
    }

    async fn fetch_recent(
        &self,
        scope: RecentScope,
        location: Option<&LocationFilter>,
    ) -> Result<Vec<FeedRow>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(FEED_COLUMNS);
        qb.push(" FROM user_content c LEFT JOIN users u ON u.id = c.user_id WHERE TRUE");
        if scope == RecentScope::SeededOnly {
            qb.push(" AND c.is_seeded = TRUE");
        }
        push_location_filter(&mut qb, location);
        qb.push(" ORDER BY c.created_at DESC");

        let rows = qb
            .build_query_as::<FeedRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to fetch recent posts: {}", e);
                DomainError::from(e)
            })?;

        debug!(rows = rows.len(), ?scope, "recent posts fetched");
        Ok(rows)
    }
}
