use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::feed_service::FeedService;
use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::domain::location::{LocationFilter, display_location_value, parse_location_filter};
use crate::presentation::dto::{
    ApiResponse, CreateStoryRequest, FeedQuery, IsInSeattleRequest, IsInSeattleResponse,
    PageRequest, StoryData,
};
use crate::presentation::middleware::JwtAuthMiddleware;
use crate::presentation::utils::{
    AuthenticatedUser, MaybeUser, feed_failure, feed_success, request_id,
};

/// Parsed paging and location of a feed request, or the ready-made 400.
pub(crate) fn feed_params(
    feeds: &FeedService,
    query: &FeedQuery,
    feed_name: &str,
) -> Result<(PageRequest, LocationFilter, String), HttpResponse> {
    let request = feeds.limits().resolve(query.page(), query.per_page());
    let filter = parse_location_filter(query.location.as_deref())
        .map_err(|err| feed_failure(&err, feed_name, request, query.location.clone()))?;
    let location = display_location_value(query.location.as_deref(), &filter);
    debug!(
        page = request.page,
        per_page = request.per_page,
        location = %filter,
        "feed request"
    );
    Ok((request, filter, location))
}

#[get("/")]
async fn get_content(
    user: MaybeUser,
    feeds: web::Data<FeedService>,
    query: web::Query<FeedQuery>,
) -> HttpResponse {
    let (request, filter, location) = match feed_params(&feeds, &query, "content") {
        Ok(params) => params,
        Err(response) => return response,
    };

    match feeds.scored_feed(request, user.0.as_ref(), &filter).await {
        Ok(page) => feed_success("Content fetched successfully", page, location, None),
        Err(err) => feed_failure(&err, "content", request, Some(location)),
    }
}

#[get("/guest_feed")]
async fn guest_feed(feeds: web::Data<FeedService>, query: web::Query<FeedQuery>) -> HttpResponse {
    let (request, filter, location) = match feed_params(&feeds, &query, "guest feed") {
        Ok(params) => params,
        Err(response) => return response,
    };

    match feeds.guest_feed(request, &filter).await {
        Ok(page) => feed_success("Guest feed fetched successfully", page, location, None),
        Err(err) => feed_failure(&err, "guest feed", request, Some(location)),
    }
}

#[get("/combined_feed")]
async fn combined_feed(
    feeds: web::Data<FeedService>,
    query: web::Query<FeedQuery>,
) -> HttpResponse {
    let (request, filter, location) = match feed_params(&feeds, &query, "combined feed") {
        Ok(params) => params,
        Err(response) => return response,
    };

    match feeds.combined_feed(request, &filter).await {
        Ok(page) => feed_success("Combined feed fetched successfully", page, location, None),
        Err(err) => feed_failure(&err, "combined feed", request, Some(location)),
    }
}

#[post("/is_in_seattle")]
async fn is_in_seattle(
    posts: web::Data<PostService>,
    payload: web::Json<IsInSeattleRequest>,
) -> Result<HttpResponse, DomainError> {
    let (latitude, longitude) = payload.coordinates().ok_or_else(|| {
        DomainError::Validation(
            "Please provide valid numeric values for 'lat' and 'lon'.".into(),
        )
    })?;

    let placement = posts.locate(latitude, longitude).await;
    Ok(HttpResponse::Ok().json(IsInSeattleResponse {
        latitude,
        longitude,
        is_in_seattle: placement.is_in_seattle,
        neighborhood: placement.neighborhood,
    }))
}

#[post("/add_story", wrap = "JwtAuthMiddleware::required()")]
async fn add_story(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    payload: web::Json<CreateStoryRequest>,
) -> Result<HttpResponse, DomainError> {
    let post = posts.create_story(user.0.id, payload.into_inner()).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.0.username,
        post_id = %post.id,
        "story added"
    );

    Ok(HttpResponse::Created().json(ApiResponse::ok(
        "Story added successfully.",
        Some(StoryData::from(post)),
    )))
}

#[delete("/delete_story/{id}", wrap = "JwtAuthMiddleware::required()")]
async fn delete_story(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    posts.delete_story(user.0.id, post_id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.0.username,
        post_id = %post_id,
        "story deleted"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok(
        "Content deleted successfully",
        None,
    )))
}

/// Routes mounted under `/api/v1/content`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_content)
        .service(guest_feed)
        .service(combined_feed)
        .service(is_in_seattle)
        .service(add_story)
        .service(delete_story);
}
