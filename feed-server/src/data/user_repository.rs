use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::user::User;
use crate::domain::viewer::Viewer;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    /// The user together with whom they follow and the blocks touching them.
    async fn load_viewer(&self, id: Uuid) -> Result<Option<Viewer>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ids(&self, sql: &str, user_id: Uuid) -> Result<HashSet<Uuid>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to load graph edges of {}: {}", user_id, e);
                DomainError::from(e)
            })?;
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, profile_picture_url, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to find user by id {}: {}", id, e);
            DomainError::from(e)
        })
    }

    async fn load_viewer(&self, id: Uuid) -> Result<Option<Viewer>, DomainError> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut viewer = Viewer::new(user.id, user.username);
        viewer.following = self
            .ids("SELECT followed_id FROM follows WHERE follower_id = $1", id)
            .await?;
        viewer.blocked = self
            .ids("SELECT blocked_id FROM blocks WHERE blocker_id = $1", id)
            .await?;
        viewer.blocked_by = self
            .ids("SELECT blocker_id FROM blocks WHERE blocked_id = $1", id)
            .await?;
        Ok(Some(viewer))
    }
}
