use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::location::format_post_location;
use crate::domain::ranking::Engagement;
use crate::domain::sources::{Dated, Sourced};

/// Hosts whose images are stand-ins rather than real thumbnails.
pub const PLACEHOLDER_PREFIXES: [&str; 2] = ["via.placeholder.com", "placeholder.pagebee.io"];

pub const NEWS_SEED_TYPE: &str = "news";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: Option<String>,
    pub body: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_in_seattle: bool,
    pub thumbnail: Option<String>,
    pub is_seeded: bool,
    pub seed_type: Option<String>,
    pub seeded_likes_count: i64,
    pub seeded_comments_count: i64,
    pub news_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a user posts a story.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub title: String,
    pub body: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_in_seattle: bool,
    pub thumbnail: String,
}

impl Post {
    pub fn new(author_id: Uuid, story: NewStory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: Some(story.title),
            body: Some(story.body),
            location: Some(story.location),
            latitude: Some(story.latitude),
            longitude: Some(story.longitude),
            is_in_seattle: story.is_in_seattle,
            thumbnail: Some(story.thumbnail),
            is_seeded: false,
            seed_type: None,
            seeded_likes_count: 0,
            seeded_comments_count: 0,
            news_link: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn location_label(&self) -> String {
        format_post_location(self.location.as_deref(), self.is_in_seattle)
    }
}

/// A post joined with its author, as returned by the feed queries.
///
/// `score` is only present for the scored feeds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub location: Option<String>,
    pub is_in_seattle: bool,
    pub thumbnail: Option<String>,
    pub is_seeded: bool,
    pub seed_type: Option<String>,
    pub seeded_likes_count: i64,
    pub seeded_comments_count: i64,
    pub news_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub score: Option<f64>,
}

impl FeedRow {
    pub fn is_seeded_news(&self) -> bool {
        self.is_seeded && self.seed_type.as_deref() == Some(NEWS_SEED_TYPE)
    }

    /// Seeded items carry ingested counts in place of live reactions/comments.
    pub fn seeded_engagement(&self) -> Option<Engagement> {
        self.is_seeded.then(|| Engagement {
            reactions: self.seeded_likes_count,
            comments: self.seeded_comments_count,
            shares: 0,
        })
    }

    pub fn has_placeholder_thumbnail(&self) -> bool {
        self.thumbnail
            .as_deref()
            .is_some_and(|thumb| !thumb.trim().is_empty() && is_placeholder_image(Some(thumb)))
    }
}

impl Sourced for FeedRow {
    type Source = Uuid;

    fn source(&self) -> Option<Uuid> {
        Some(self.author_id)
    }
}

impl Dated for FeedRow {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

/// True for missing URLs and for images served from a placeholder host.
pub fn is_placeholder_image(url: Option<&str>) -> bool {
    let Some(url) = url else {
        return true;
    };
    let normalized = url.trim().to_lowercase();
    if normalized.is_empty() {
        return true;
    }
    let bare = normalized
        .strip_prefix("https://")
        .or_else(|| normalized.strip_prefix("http://"))
        .unwrap_or(&normalized);
    PLACEHOLDER_PREFIXES
        .iter()
        .any(|prefix| bare.starts_with(prefix))
}

/// Case-insensitive LIKE patterns matching every placeholder form, with and
/// without a scheme.
pub fn placeholder_like_patterns() -> Vec<String> {
    PLACEHOLDER_PREFIXES
        .iter()
        .flat_map(|prefix| {
            [
                format!("{prefix}%"),
                format!("http://{prefix}%"),
                format!("https://{prefix}%"),
            ]
        })
        .collect()
}

pub fn time_since_post(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - created_at;
    if diff.num_days() > 0 {
        format!("{} days ago", diff.num_days())
    } else if diff.num_hours() > 0 {
        format!("{} hours ago", diff.num_hours())
    } else if diff.num_minutes() > 0 {
        format!("{} minutes ago", diff.num_minutes())
    } else {
        "just now".to_string()
    }
}
