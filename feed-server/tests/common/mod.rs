//! In-memory stand-ins for the repositories and the geocoder, so the HTTP
//! app can be driven without Postgres or the network.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use feed_server::application::auth_service::AuthService;
use feed_server::application::feed_service::{FeedService, PageLimits};
use feed_server::application::post_service::PostService;
use feed_server::data::engagement_repository::EngagementRepository;
use feed_server::data::feed_repository::{Audience, FeedRepository, RecentScope, ScoredFeedQuery};
use feed_server::data::post_repository::PostRepository;
use feed_server::data::user_repository::UserRepository;
use feed_server::domain::error::DomainError;
use feed_server::domain::location::{Address, LocationFilter};
use feed_server::domain::post::{FeedRow, Post, is_placeholder_image};
use feed_server::domain::ranking::Engagement;
use feed_server::domain::reaction::{Reaction, ReactionType};
use feed_server::domain::user::User;
use feed_server::domain::viewer::Viewer;
use feed_server::infrastructure::geocoding::Geocoder;
use feed_server::infrastructure::security::JwtKeys;
use feed_server::server::AppState;

pub const SECRET: &str = "integration-test-secret";

pub fn token_for(user_id: Uuid) -> String {
    JwtKeys::new(SECRET.into())
        .generate_token(user_id)
        .expect("token")
}

pub fn feed_row(author_id: Uuid, created_at: DateTime<Utc>) -> FeedRow {
    FeedRow {
        id: Uuid::new_v4(),
        author_id,
        username: Some(format!("user-{}", &author_id.to_string()[..8])),
        profile_picture_url: None,
        title: Some("Ferry at sunset".into()),
        body: Some("Golden light over the sound".into()),
        location: None,
        is_in_seattle: true,
        thumbnail: Some("https://cdn.example.com/story.jpg".into()),
        is_seeded: false,
        seed_type: None,
        seeded_likes_count: 0,
        seeded_comments_count: 0,
        news_link: None,
        created_at,
        updated_at: created_at,
        score: None,
    }
}

pub fn seeded_news(author_id: Uuid, created_at: DateTime<Utc>, likes: i64) -> FeedRow {
    FeedRow {
        is_seeded: true,
        seed_type: Some("news".into()),
        seeded_likes_count: likes,
        seeded_comments_count: likes / 2,
        news_link: Some("https://news.example.com/article".into()),
        ..feed_row(author_id, created_at)
    }
}

#[derive(Default)]
pub struct InMemoryFeeds {
    pub rows: Mutex<Vec<FeedRow>>,
    pub hidden: Mutex<HashSet<(Uuid, Uuid)>>,
    pub scored_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl InMemoryFeeds {
    pub fn with_rows(rows: Vec<FeedRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn visible(row: &FeedRow, audience: &Audience<'_>, hidden: &HashSet<(Uuid, Uuid)>) -> bool {
        match audience {
            Audience::Anonymous => true,
            Audience::Viewer(viewer) => {
                !viewer.blocked.contains(&row.author_id) && !hidden.contains(&(viewer.id, row.id))
            }
            Audience::Following(viewer) => {
                viewer.following.contains(&row.author_id)
                    && !viewer.excluded_authors().contains(&row.author_id)
            }
        }
    }
}

fn location_matches(row: &FeedRow, location: Option<&LocationFilter>) -> bool {
    location.is_none_or(|filter| filter.matches(row.location.as_deref(), row.is_in_seattle))
}

#[async_trait]
impl FeedRepository for InMemoryFeeds {
    async fn fetch_scored(
        &self,
        query: ScoredFeedQuery<'_>,
    ) -> Result<(Vec<FeedRow>, i64), DomainError> {
        self.scored_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("connection refused".into()));
        }

        let hidden = self.hidden.lock().unwrap().clone();
        let mut rows: Vec<FeedRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| Self::visible(row, &query.audience, &hidden))
            .filter(|row| location_matches(row, query.location))
            .filter(|row| !is_placeholder_image(row.thumbnail.as_deref()))
            .cloned()
            .map(|mut row| {
                row.score = Some(row.score.unwrap_or_default());
                row
            })
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn fetch_recent(
        &self,
        scope: RecentScope,
        location: Option<&LocationFilter>,
    ) -> Result<Vec<FeedRow>, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("connection refused".into()));
        }
        let mut rows: Vec<FeedRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| scope == RecentScope::All || row.is_seeded)
            .filter(|row| location_matches(row, location))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryEngagement {
    pub counts: Mutex<HashMap<Uuid, Engagement>>,
    pub reactions: Mutex<Vec<(Uuid, Reaction)>>,
    pub reposts: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl InMemoryEngagement {
    pub fn react(&self, user_id: Uuid, content_id: Uuid, reaction_type: ReactionType) {
        self.reactions.lock().unwrap().push((
            user_id,
            Reaction {
                content_id,
                reaction_type,
                created_at: Utc::now(),
            },
        ));
    }
}

#[async_trait]
impl EngagementRepository for InMemoryEngagement {
    async fn engagement_counts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Engagement>, DomainError> {
        let counts = self.counts.lock().unwrap();
        Ok(post_ids
            .iter()
            .filter_map(|id| counts.get(id).map(|e| (*id, *e)))
            .collect())
    }

    async fn reaction_breakdown(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<(ReactionType, i64)>>, DomainError> {
        let mut tally: HashMap<Uuid, HashMap<ReactionType, i64>> = HashMap::new();
        for (_, reaction) in self.reactions.lock().unwrap().iter() {
            if post_ids.contains(&reaction.content_id) {
                *tally
                    .entry(reaction.content_id)
                    .or_default()
                    .entry(reaction.reaction_type)
                    .or_default() += 1;
            }
        }
        Ok(tally
            .into_iter()
            .map(|(id, kinds)| (id, kinds.into_iter().collect()))
            .collect())
    }

    async fn viewer_reactions(&self, viewer_id: Uuid) -> Result<Vec<Reaction>, DomainError> {
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == viewer_id)
            .map(|(_, reaction)| reaction.clone())
            .collect())
    }

    async fn viewer_reposts(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>, DomainError> {
        Ok(self
            .reposts
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == viewer_id)
            .map(|(_, content)| *content)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    pub viewers: Mutex<HashMap<Uuid, Viewer>>,
    pub fail: AtomicBool,
}

impl InMemoryUsers {
    pub fn add(&self, viewer: Viewer) {
        self.viewers.lock().unwrap().insert(viewer.id, viewer);
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.viewers.lock().unwrap().get(&id).map(|viewer| User {
            id: viewer.id,
            username: viewer.username.clone(),
            profile_picture_url: None,
            created_at: Utc::now(),
        }))
    }

    async fn load_viewer(&self, id: Uuid) -> Result<Option<Viewer>, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("users table unavailable".into()));
        }
        Ok(self.viewers.lock().unwrap().get(&id).cloned())
    }
}

/// Stories written here also show up in `feed` when it is set, the way the
/// shared `user_content` table behaves.
#[derive(Default)]
pub struct InMemoryPosts {
    pub posts: Mutex<HashMap<Uuid, Post>>,
    pub feed: Option<Arc<InMemoryFeeds>>,
}

fn as_feed_row(post: &Post) -> FeedRow {
    FeedRow {
        id: post.id,
        author_id: post.author_id,
        username: None,
        profile_picture_url: None,
        title: post.title.clone(),
        body: post.body.clone(),
        location: post.location.clone(),
        is_in_seattle: post.is_in_seattle,
        thumbnail: post.thumbnail.clone(),
        is_seeded: post.is_seeded,
        seed_type: post.seed_type.clone(),
        seeded_likes_count: post.seeded_likes_count,
        seeded_comments_count: post.seeded_comments_count,
        news_link: post.news_link.clone(),
        created_at: post.created_at,
        updated_at: post.updated_at,
        score: None,
    }
}

#[async_trait]
impl PostRepository for InMemoryPosts {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        self.posts.lock().unwrap().insert(post.id, post.clone());
        if let Some(feed) = &self.feed {
            feed.rows.lock().unwrap().push(as_feed_row(&post));
        }
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> Result<(), DomainError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.get(&id) {
            None => Err(DomainError::PostNotFound(id)),
            Some(post) if post.author_id != author_id => Err(DomainError::Forbidden),
            Some(_) => {
                posts.remove(&id);
                if let Some(feed) = &self.feed {
                    feed.rows.lock().unwrap().retain(|row| row.id != id);
                }
                Ok(())
            }
        }
    }
}

/// Answers from fixed tables.
#[derive(Default)]
pub struct StaticGeocoder {
    pub address: Option<Address>,
    pub places: HashMap<String, (f64, f64)>,
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<Address>, DomainError> {
        Ok(self.address.clone())
    }

    async fn search(&self, query: &str) -> Result<Option<(f64, f64)>, DomainError> {
        Ok(self.places.get(&query.to_lowercase()).copied())
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledGeocoder;

#[async_trait]
impl Geocoder for StalledGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<Address>, DomainError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn search(&self, _query: &str) -> Result<Option<(f64, f64)>, DomainError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}

pub fn ballard() -> Address {
    Address {
        neighbourhood: Some("Ballard".into()),
        city: Some("Seattle".into()),
        state: Some("Washington".into()),
        country_code: Some("us".into()),
        ..Default::default()
    }
}

pub struct Fixture {
    pub feeds: Arc<InMemoryFeeds>,
    pub engagement: Arc<InMemoryEngagement>,
    pub users: Arc<InMemoryUsers>,
    pub posts: Arc<InMemoryPosts>,
    pub geocoder: Arc<dyn Geocoder>,
    pub geocode_deadline: Duration,
}

impl Fixture {
    pub fn new(rows: Vec<FeedRow>) -> Self {
        let feeds = Arc::new(InMemoryFeeds::with_rows(rows));
        Self {
            feeds: feeds.clone(),
            engagement: Arc::new(InMemoryEngagement::default()),
            users: Arc::new(InMemoryUsers::default()),
            posts: Arc::new(InMemoryPosts {
                feed: Some(feeds),
                ..Default::default()
            }),
            geocoder: Arc::new(StaticGeocoder::default()),
            geocode_deadline: Duration::from_secs(2),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>, deadline: Duration) -> Self {
        self.geocoder = geocoder;
        self.geocode_deadline = deadline;
        self
    }

    pub fn state(&self) -> AppState {
        AppState {
            auth: AuthService::new(self.users.clone(), JwtKeys::new(SECRET.into())),
            feeds: FeedService::new(
                self.feeds.clone(),
                self.engagement.clone(),
                PageLimits::new(10, 100),
            ),
            posts: PostService::new(
                self.posts.clone(),
                self.geocoder.clone(),
                self.geocode_deadline,
            ),
        }
    }
}
