pub mod config;
pub mod database;
pub mod geocoding;
pub mod logging;
pub mod security;
