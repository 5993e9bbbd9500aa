//! HTTP surface of the node gateway: axum routes and request-scoped middleware.

pub mod middleware;
pub mod router;
