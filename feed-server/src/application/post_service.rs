use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::data::post_repository::PostRepository;
use crate::domain::error::DomainError;
use crate::domain::location::{Address, Placement, classify_place};
use crate::domain::post::{NewStory, Post};
use crate::infrastructure::geocoding::Geocoder;
use crate::presentation::dto::CreateStoryRequest;

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    geocoder: Arc<dyn Geocoder>,
    geocode_deadline: Duration,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        geocoder: Arc<dyn Geocoder>,
        geocode_deadline: Duration,
    ) -> Self {
        Self {
            repo,
            geocoder,
            geocode_deadline,
        }
    }

    /// Reverse geocodes within the deadline. Failures and timeouts degrade to
    /// no address, so the caller falls back to coordinate-only classification.
    async fn address_at(&self, lat: f64, lon: f64) -> Option<Address> {
        match timeout(self.geocode_deadline, self.geocoder.reverse(lat, lon)).await {
            Ok(Ok(address)) => address,
            Ok(Err(e)) => {
                warn!(lat, lon, "reverse geocoding failed: {}", e);
                None
            }
            Err(_) => {
                warn!(lat, lon, deadline_ms = self.geocode_deadline.as_millis(), "reverse geocoding timed out");
                None
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn locate(&self, lat: f64, lon: f64) -> Placement {
        let address = self.address_at(lat, lon).await;
        classify_place(lat, lon, address.as_ref())
    }

    async fn resolve_coordinates(
        &self,
        request: &CreateStoryRequest,
    ) -> Result<(f64, f64), DomainError> {
        let manual = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match (request.latitude, request.longitude, manual) {
            (Some(lat), Some(lon), _) => Ok((lat, lon)),
            (Some(_), None, _) | (None, Some(_), _) => Err(DomainError::Validation(
                "Both latitude and longitude must be provided together.".into(),
            )),
            (None, None, None) => Err(DomainError::Validation(
                "Provide either latitude & longitude or a neighborhood name.".into(),
            )),
            (None, None, Some(name)) => {
                let found = match timeout(self.geocode_deadline, self.geocoder.search(name)).await {
                    Ok(Ok(found)) => found,
                    Ok(Err(e)) => {
                        warn!(location = name, "location search failed: {}", e);
                        None
                    }
                    Err(_) => {
                        warn!(location = name, "location search timed out");
                        None
                    }
                };
                found.ok_or_else(|| {
                    DomainError::Validation(format!("Could not find coordinates for '{name}'"))
                })
            }
        }
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_story(
        &self,
        author_id: Uuid,
        request: CreateStoryRequest,
    ) -> Result<Post, DomainError> {
        let title = request.title.trim().to_string();
        let body = request.body.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }

        let (latitude, longitude) = self.resolve_coordinates(&request).await?;
        let thumbnail = request
            .thumbnail_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DomainError::Validation("thumbnail_url is required".into()))?
            .to_string();

        let placement = self.locate(latitude, longitude).await;
        let post = Post::new(
            author_id,
            NewStory {
                title,
                body,
                location: placement.label,
                latitude,
                longitude,
                is_in_seattle: placement.is_in_seattle,
                thumbnail,
            },
        );

        let post = self.repo.create(post).await?;
        info!(post_id = %post.id, is_in_seattle = post.is_in_seattle, "story created");
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn delete_story(&self, author_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_post(post_id, author_id).await
    }
}
