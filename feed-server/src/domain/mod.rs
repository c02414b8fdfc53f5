pub mod error;
pub mod location;
pub mod post;
pub mod ranking;
pub mod reaction;
pub mod sources;
pub mod user;
pub mod viewer;
