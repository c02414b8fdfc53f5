use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::ranking::Engagement;
use crate::domain::reaction::{Reaction, ReactionType};

/// Per-post engagement lookups used to enrich a feed page.
///
/// Every method takes the whole page at once.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn engagement_counts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Engagement>, DomainError>;

    async fn reaction_breakdown(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<(ReactionType, i64)>>, DomainError>;

    async fn viewer_reactions(&self, viewer_id: Uuid) -> Result<Vec<Reaction>, DomainError>;

    async fn viewer_reposts(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresEngagementRepository {
    pool: PgPool,
}

impl PostgresEngagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for PostgresEngagementRepository {
    async fn engagement_counts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Engagement>, DomainError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT ids.id,
                   (SELECT COUNT(*) FROM reactions r WHERE r.content_id = ids.id),
                   (SELECT COUNT(*) FROM comments cm WHERE cm.content_id = ids.id),
                   (SELECT COUNT(*) FROM shares s WHERE s.content_id = ids.id)
            FROM UNNEST($1::uuid[]) AS ids(id)
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to count engagement: {}", e);
            DomainError::from(e)
        })?;

        Ok(rows
            .into_iter()
            .map(|(id, reactions, comments, shares)| {
                (
                    id,
                    Engagement {
                        reactions,
                        comments,
                        shares,
                    },
                )
            })
            .collect())
    }

    async fn reaction_breakdown(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<(ReactionType, i64)>>, DomainError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String, i64)> = sqlx::query_as(
            r#"
            SELECT content_id, reaction_type, COUNT(*)
            FROM reactions
            WHERE content_id = ANY($1)
            GROUP BY content_id, reaction_type
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to load reaction breakdown: {}", e);
            DomainError::from(e)
        })?;

        let mut breakdown: HashMap<Uuid, Vec<(ReactionType, i64)>> = HashMap::new();
        for (content_id, kind, count) in rows {
            match kind.parse::<ReactionType>() {
                Ok(kind) => breakdown.entry(content_id).or_default().push((kind, count)),
                Err(e) => warn!(%content_id, "skipping reaction row: {}", e),
            }
        }
        Ok(breakdown)
    }

    async fn viewer_reactions(&self, viewer_id: Uuid) -> Result<Vec<Reaction>, DomainError> {
        let rows: Vec<(Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT content_id, reaction_type, created_at
            FROM reactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to load reactions of {}: {}", viewer_id, e);
            DomainError::from(e)
        })?;

        Ok(rows
            .into_iter()
            .filter_map(|(content_id, kind, created_at)| {
                let reaction_type = kind.parse().ok()?;
                Some(Reaction {
                    content_id,
                    reaction_type,
                    created_at,
                })
            })
            .collect())
    }

    async fn viewer_reposts(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>, DomainError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT content_id FROM reposts WHERE user_id = $1")
                .bind(viewer_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    error!("failed to load reposts of {}: {}", viewer_id, e);
                    DomainError::from(e)
                })?;
        Ok(ids.into_iter().collect())
    }
}
