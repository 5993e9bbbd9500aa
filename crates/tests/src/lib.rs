//! Integration tests for the node gateway.
//!
//! This crate contains:
//!
//! - `gateway_flow_tests`: request flows through the router, gateway and HTTP node client
//! - `session_lifecycle_tests`: connect idempotence, disconnect, credential loss, concurrency
//! - `mock_infrastructure`: reusable mock node, failing connectors and fixtures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No running node is needed: the node side is a mockito server on a random local port.


#[cfg(test)]
mod session_lifecycle_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
