use std::sync::Arc;

use anyhow::Context;
use feed_server::application::auth_service::AuthService;
use feed_server::application::feed_service::{FeedService, PageLimits};
use feed_server::application::post_service::PostService;
use feed_server::data::engagement_repository::PostgresEngagementRepository;
use feed_server::data::feed_repository::PostgresFeedRepository;
use feed_server::data::post_repository::PostgresPostRepository;
use feed_server::data::user_repository::PostgresUserRepository;
use feed_server::infrastructure::config::AppConfig;
use feed_server::infrastructure::database::{create_pool, run_migrations};
use feed_server::infrastructure::geocoding::NominatimGeocoder;
use feed_server::infrastructure::logging::init_logging;
use feed_server::infrastructure::security::JwtKeys;
use feed_server::server::{AppState, start_server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_logging(config.log_format);

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let geocoder = NominatimGeocoder::new(
        config.nominatim_base_url.clone(),
        config.geocode_timeout(),
        config.geocode_max_retries,
    )
    .context("failed to build geocoding client")?;

    let state = AppState {
        auth: AuthService::new(
            Arc::new(PostgresUserRepository::new(pool.clone())),
            JwtKeys::new(config.jwt_secret.clone()),
        ),
        feeds: FeedService::new(
            Arc::new(PostgresFeedRepository::new(pool.clone())),
            Arc::new(PostgresEngagementRepository::new(pool.clone())),
            PageLimits::new(config.default_per_page, config.max_per_page),
        ),
        posts: PostService::new(
            Arc::new(PostgresPostRepository::new(pool)),
            Arc::new(geocoder),
            config.geocode_deadline,
        ),
    };

    start_server(config, state).await
}
