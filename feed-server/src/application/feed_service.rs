use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::data::engagement_repository::EngagementRepository;
use crate::data::feed_repository::{Audience, FeedRepository, RecentScope, ScoredFeedQuery};
use crate::domain::error::DomainError;
use crate::domain::location::{LocationFilter, format_post_location};
use crate::domain::post::{FeedRow, time_since_post};
use crate::domain::ranking::Engagement;
use crate::domain::reaction::{Reaction, ReactionType, top_reactions};
use crate::domain::sources::distribute_sources;
use crate::domain::viewer::Viewer;
use crate::presentation::dto::{
    ContentItem, PageRequest, RankingFields, SeedFields, UserSummary, ViewerFlags,
};

const TOP_REACTIONS: usize = 2;

/// Bounds applied to client-supplied paging.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl PageLimits {
    pub fn new(default_per_page: u32, max_per_page: u32) -> Self {
        Self {
            default_per_page,
            max_per_page,
        }
    }

    /// `page` is at least 1 and `per_page` stays within `1..=max_per_page`.
    pub fn resolve(&self, page: Option<i64>, per_page: Option<i64>) -> PageRequest {
        let max = i64::from(self.max_per_page.max(1));
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let per_page = per_page
            .unwrap_or(i64::from(self.default_per_page))
            .clamp(1, max);
        PageRequest {
            page: page as u32,
            per_page: per_page as u32,
        }
    }
}

/// A page of assembled feed items plus the unpaginated total.
#[derive(Debug)]
pub struct FeedPage {
    pub items: Vec<ContentItem>,
    pub request: PageRequest,
    pub total_items: i64,
}

#[derive(Clone)]
pub struct FeedService {
    feeds: Arc<dyn FeedRepository>,
    engagement: Arc<dyn EngagementRepository>,
    limits: PageLimits,
}

impl FeedService {
    pub fn new(
        feeds: Arc<dyn FeedRepository>,
        engagement: Arc<dyn EngagementRepository>,
        limits: PageLimits,
    ) -> Self {
        Self {
            feeds,
            engagement,
            limits,
        }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Main feed ranked by decayed engagement.
    #[instrument(skip(self, viewer), fields(viewer = ?viewer.map(|v| v.id), location = %location))]
    pub async fn scored_feed(
        &self,
        request: PageRequest,
        viewer: Option<&Viewer>,
        location: &LocationFilter,
    ) -> Result<FeedPage, DomainError> {
        let audience = match viewer {
            Some(viewer) => Audience::Viewer(viewer),
            None => Audience::Anonymous,
        };
        let (rows, total_items) = self
            .feeds
            .fetch_scored(ScoredFeedQuery {
                page: request.page,
                per_page: request.per_page,
                audience,
                location: Some(location),
            })
            .await?;
        debug!(rows = rows.len(), total_items, "main feed rows fetched");

        let flags = match viewer {
            Some(viewer) => Some(self.viewer_state(viewer.id).await?),
            None => None,
        };
        let items = self.rank_items(rows, flags.as_ref()).await?;

        Ok(FeedPage {
            items,
            request,
            total_items,
        })
    }

    /// Posts by followed authors, ranked like the main feed. Also returns the
    /// viewer's own reactions.
    #[instrument(skip(self, viewer), fields(viewer = %viewer.id, location = %location))]
    pub async fn mypulse(
        &self,
        request: PageRequest,
        viewer: &Viewer,
        location: &LocationFilter,
    ) -> Result<(FeedPage, Vec<Reaction>), DomainError> {
        let (rows, total_items) = if viewer.following.is_empty() {
            debug!("viewer follows nobody, skipping feed query");
            (Vec::new(), 0)
        } else {
            self.feeds
                .fetch_scored(ScoredFeedQuery {
                    page: request.page,
                    per_page: request.per_page,
                    audience: Audience::Following(viewer),
                    location: Some(location),
                })
                .await?
        };

        let state = self.viewer_state(viewer.id).await?;
        let items = self.rank_items(rows, Some(&state)).await?;
        let page = FeedPage {
            items,
            request,
            total_items,
        };
        Ok((page, state.reactions))
    }

    /// Seeded posts only, interleaved by author.
    #[instrument(skip(self), fields(location = %location))]
    pub async fn guest_feed(
        &self,
        request: PageRequest,
        location: &LocationFilter,
    ) -> Result<FeedPage, DomainError> {
        self.round_robin(RecentScope::SeededOnly, request, location)
            .await
    }

    /// Seeded and user posts, interleaved by author.
    #[instrument(skip(self), fields(location = %location))]
    pub async fn combined_feed(
        &self,
        request: PageRequest,
        location: &LocationFilter,
    ) -> Result<FeedPage, DomainError> {
        self.round_robin(RecentScope::All, request, location).await
    }

    async fn round_robin(
        &self,
        scope: RecentScope,
        request: PageRequest,
        location: &LocationFilter,
    ) -> Result<FeedPage, DomainError> {
        let mut rows = self.feeds.fetch_recent(scope, Some(location)).await?;
        rows.retain(|row| !row.has_placeholder_thumbnail());

        let ordered = distribute_sources(rows);
        let total_items = ordered.len() as i64;
        let page_rows: Vec<FeedRow> = ordered
            .into_iter()
            .skip(request.offset())
            .take(request.per_page as usize)
            .collect();
        debug!(
            total_items,
            page_rows = page_rows.len(),
            ?scope,
            "round robin page assembled"
        );

        let live_ids: Vec<Uuid> = page_rows
            .iter()
            .filter(|row| !row.is_seeded)
            .map(|row| row.id)
            .collect();
        let live = self.engagement.engagement_counts(&live_ids).await?;

        let now = Utc::now();
        let items = page_rows
            .into_iter()
            .map(|row| {
                let engagement = row
                    .seeded_engagement()
                    .unwrap_or_else(|| live.get(&row.id).copied().unwrap_or_default());
                let seed = SeedFields {
                    is_seeded: row.is_seeded,
                    seed_type: row.seed_type.clone(),
                    link: row.is_seeded.then(|| row.news_link.clone()).flatten(),
                };
                let mut item = base_item(row, engagement, now);
                item.seed = Some(seed);
                item
            })
            .collect();

        Ok(FeedPage {
            items,
            request,
            total_items,
        })
    }

    async fn viewer_state(&self, viewer_id: Uuid) -> Result<ViewerState, DomainError> {
        let reactions = self.engagement.viewer_reactions(viewer_id).await?;
        let reposts = self.engagement.viewer_reposts(viewer_id).await?;
        Ok(ViewerState { reactions, reposts })
    }

    /// Enriches scored rows with batched counts, top reactions and, for a
    /// signed-in viewer, their own reaction and repost flags.
    async fn rank_items(
        &self,
        rows: Vec<FeedRow>,
        viewer: Option<&ViewerState>,
    ) -> Result<Vec<ContentItem>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let counts = self.engagement.engagement_counts(&ids).await?;
        let breakdown = self.engagement.reaction_breakdown(&ids).await?;
        let reacted = viewer.map(ViewerState::reaction_by_post);

        let now = Utc::now();
        let items = rows
            .into_iter()
            .map(|row| {
                let engagement = row
                    .seeded_engagement()
                    .unwrap_or_else(|| counts.get(&row.id).copied().unwrap_or_default());
                let ranking = RankingFields {
                    score: row.score.unwrap_or_default(),
                    top_reactions: breakdown
                        .get(&row.id)
                        .map(|kinds| top_reactions(kinds, TOP_REACTIONS))
                        .unwrap_or_default(),
                    link: row.is_seeded_news().then(|| row.news_link.clone()).flatten(),
                };
                let flags = match (viewer, reacted.as_ref()) {
                    (Some(state), Some(reacted)) => {
                        let reaction_type = reacted.get(&row.id).copied();
                        Some(ViewerFlags {
                            user_has_reacted: reaction_type.is_some(),
                            user_reaction_type: reaction_type,
                            has_user_reposted: state.reposts.contains(&row.id),
                        })
                    }
                    _ => None,
                };
                let mut item = base_item(row, engagement, now);
                item.ranking = Some(ranking);
                item.viewer = flags;
                item
            })
            .collect();
        Ok(items)
    }
}

struct ViewerState {
    reactions: Vec<Reaction>,
    reposts: HashSet<Uuid>,
}

impl ViewerState {
    fn reaction_by_post(&self) -> HashMap<Uuid, ReactionType> {
        self.reactions
            .iter()
            .map(|reaction| (reaction.content_id, reaction.reaction_type))
            .collect()
    }
}

fn base_item(row: FeedRow, engagement: Engagement, now: DateTime<Utc>) -> ContentItem {
    ContentItem {
        location_label: format_post_location(row.location.as_deref(), row.is_in_seattle),
        time_since_post: time_since_post(row.created_at, now),
        user: UserSummary {
            id: row.author_id,
            username: row.username,
            profile_picture_url: row.profile_picture_url,
        },
        id: row.id,
        title: row.title,
        body: row.body,
        location: row.location,
        created_at: row.created_at,
        updated_at: row.updated_at,
        thumbnail: row.thumbnail,
        is_in_seattle: row.is_in_seattle,
        reactions_count: engagement.reactions,
        comments_count: engagement.comments,
        ranking: None,
        seed: None,
        viewer: None,
    }
}
