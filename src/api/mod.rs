//! HTTP API 계층

pub mod auth;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod routes;

pub use routes::create_api_router;
