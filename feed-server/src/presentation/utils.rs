use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{Ready, ready};
use tracing::error;

use crate::application::feed_service::FeedPage;
use crate::domain::error::DomainError;
use crate::domain::viewer::Viewer;
use crate::presentation::dto::{
    FeedData, FeedEnvelope, PageRequest, Pagination, PaginationBody, QueryEcho, ReactionEntry,
};
use crate::presentation::middleware::RequestId;

/// The signed-in viewer. Rejects the request with 401 when nobody is signed in.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Viewer);

impl FromRequest for AuthenticatedUser {
    type Error = DomainError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Viewer>()
                .cloned()
                .map(AuthenticatedUser)
                .ok_or(DomainError::Unauthorized),
        )
    }
}

/// The signed-in viewer, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Viewer>);

impl FromRequest for MaybeUser {
    type Error = DomainError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(MaybeUser(req.extensions().get::<Viewer>().cloned())))
    }
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}

pub fn feed_success(
    message: &str,
    page: FeedPage,
    location: String,
    reactions: Option<Vec<ReactionEntry>>,
) -> HttpResponse {
    let pagination = Pagination::new(page.request, page.total_items);
    HttpResponse::Ok().json(FeedEnvelope {
        success: "success",
        message: message.to_string(),
        data: Some(FeedData {
            content: page.items,
            reactions,
        }),
        query: QueryEcho {
            page: page.request.page,
            per_page: page.request.per_page,
            location: Some(location),
        },
        pagination: PaginationBody::Page(pagination),
    })
}

/// Feed failure envelope: 400 with the parser message for a bad location,
/// otherwise 500 with a generic message naming the feed.
pub fn feed_failure(
    err: &DomainError,
    feed_name: &str,
    request: PageRequest,
    location: Option<String>,
) -> HttpResponse {
    let (status, message) = match err {
        DomainError::InvalidLocation(message) => (StatusCode::BAD_REQUEST, message.clone()),
        other => {
            error!(feed = feed_name, "failed to fetch feed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch {feed_name}"),
            )
        }
    };

    HttpResponse::build(status).json(FeedEnvelope {
        success: "error",
        message,
        data: None,
        query: QueryEcho {
            page: request.page,
            per_page: request.per_page,
            location,
        },
        pagination: PaginationBody::Empty {},
    })
}
