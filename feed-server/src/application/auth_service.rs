use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::data::user_repository::UserRepository;
use crate::domain::{error::DomainError, viewer::Viewer};
use crate::infrastructure::security::JwtKeys;

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    /// Resolves a bearer token to the viewer it belongs to, with their follow
    /// and block sets loaded.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<Viewer, DomainError> {
        let claims = self.keys.verify_token(token).map_err(|e| {
            warn!("rejected token: {}", e);
            DomainError::Unauthorized
        })?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthorized)?;

        self.repo
            .load_viewer(user_id)
            .await?
            .ok_or(DomainError::Unauthorized)
    }
}
