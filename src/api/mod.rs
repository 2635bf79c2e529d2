//! HTTP surface: routing, handlers and the authentication extractor.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::configure;
