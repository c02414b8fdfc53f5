use actix_web::{HttpResponse, get, web};

use crate::application::feed_service::FeedService;
use crate::presentation::dto::{FeedQuery, ReactionEntry};
use crate::presentation::handlers::content::feed_params;
use crate::presentation::utils::{AuthenticatedUser, feed_failure, feed_success};

#[get("/mypulse")]
async fn mypulse(
    user: AuthenticatedUser,
    feeds: web::Data<FeedService>,
    query: web::Query<FeedQuery>,
) -> HttpResponse {
    let (request, filter, location) = match feed_params(&feeds, &query, "my pulse content") {
        Ok(params) => params,
        Err(response) => return response,
    };

    match feeds.mypulse(request, &user.0, &filter).await {
        Ok((page, reactions)) => feed_success(
            "My Pulse content fetched successfully",
            page,
            location,
            Some(reactions.into_iter().map(ReactionEntry::from).collect()),
        ),
        Err(err) => feed_failure(&err, "my pulse content", request, Some(location)),
    }
}

/// Routes mounted under `/api/v1/feed`; every one needs a signed-in viewer.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(mypulse);
}
