pub mod engagement_repository;
pub mod feed_repository;
pub mod filters;
pub mod post_repository;
pub mod user_repository;
