//! HTTP middleware components for the gateway server.
//!
//! Request-scoped concerns that sit in front of the router: correlation IDs and the
//! tracing span each request runs in. Connection policy lives in `nodegate_core`.

pub mod correlation_id;

pub use correlation_id::{create_request_id_layers, request_span, UuidRequestIdGenerator, X_REQUEST_ID};
