use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::domain::reaction::{Reaction, ReactionType};

// ======================= FEEDS =======================

/// Raw feed query string. Numbers that fail to parse fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub location: Option<String>,
}

impl FeedQuery {
    pub fn page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|raw| raw.trim().parse().ok())
    }

    pub fn per_page(&self) -> Option<i64> {
        self.per_page.as_deref().and_then(|raw| raw.trim().parse().ok())
    }
}

/// Resolved paging window of a feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

#[derive(Debug, Serialize)]
pub struct QueryEcho {
    pub page: u32,
    pub per_page: u32,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: i64) -> Self {
        let per_page = i64::from(request.per_page.max(1));
        let total_pages = (total_items + per_page - 1) / per_page;
        Self {
            current_page: request.page,
            total_pages,
            total_items,
            has_next: i64::from(request.page) < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PaginationBody {
    Page(Pagination),
    Empty {},
}

#[derive(Debug, Serialize)]
pub struct FeedEnvelope {
    pub success: &'static str,
    pub message: String,
    pub data: Option<FeedData>,
    pub query: QueryEcho,
    pub pagination: PaginationBody,
}

#[derive(Debug, Serialize)]
pub struct FeedData {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<ReactionEntry>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionEntry {
    pub content_id: Uuid,
    pub reaction_type: ReactionType,
    pub timestamp: DateTime<Utc>,
}

impl From<Reaction> for ReactionEntry {
    fn from(reaction: Reaction) -> Self {
        Self {
            content_id: reaction.content_id,
            reaction_type: reaction.reaction_type,
            timestamp: reaction.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// One feed entry. The optional groups are flattened in only for the feeds
/// that report them.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: Option<String>,
    pub location: Option<String>,
    pub location_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub time_since_post: String,
    pub user: UserSummary,
    pub thumbnail: Option<String>,
    pub is_in_seattle: bool,
    pub reactions_count: i64,
    pub comments_count: i64,
    #[serde(flatten)]
    pub ranking: Option<RankingFields>,
    #[serde(flatten)]
    pub seed: Option<SeedFields>,
    #[serde(flatten)]
    pub viewer: Option<ViewerFlags>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingFields {
    pub score: f64,
    pub top_reactions: Vec<ReactionType>,
    /// Set for seeded news only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedFields {
    pub is_seeded: bool,
    pub seed_type: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerFlags {
    pub user_has_reacted: bool,
    pub user_reaction_type: Option<ReactionType>,
    pub has_user_reposted: bool,
}

// ======================= STORIES =======================

#[derive(Debug, Default, Deserialize)]
pub struct CreateStoryRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoryData {
    pub post: StoryView,
}

/// A stored post plus the label the feeds would show for it.
#[derive(Debug, Serialize)]
pub struct StoryView {
    #[serde(flatten)]
    pub post: Post,
    pub location_label: String,
}

impl From<Post> for StoryData {
    fn from(post: Post) -> Self {
        let location_label = post.location_label();
        Self {
            post: StoryView {
                post,
                location_label,
            },
        }
    }
}

/// Coordinates may arrive as JSON numbers or numeric strings.
#[derive(Debug, Deserialize)]
pub struct IsInSeattleRequest {
    pub lat: Option<Value>,
    pub lon: Option<Value>,
}

impl IsInSeattleRequest {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((as_number(self.lat.as_ref()?)?, as_number(self.lon.as_ref()?)?))
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct IsInSeattleResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub is_in_seattle: bool,
    pub neighborhood: Option<String>,
}

// ======================= Utils =======================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: "success",
            message: message.into(),
            data,
        }
    }
}
