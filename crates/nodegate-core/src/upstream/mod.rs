//! The single upstream session and everything that talks to the node.
//!
//! # Components
//!
//! - [`ConnectionManager`]: owns the session slot and the connect/disconnect state machine;
//!   the only caller of [`NodeClient`]s.
//! - [`NodeClient`] / [`NodeConnector`]: adapter seam between the manager and the node's RPC
//!   protocol. [`HttpNodeConnector`] is the production implementation.
//! - [`errors`]: raw [`UpstreamError`]s and their classification into [`ErrorKind`].
//!
//! # State Machine
//!
//! ```text
//! disconnected --connect (probe ok)-----> connected
//! disconnected --connect (probe failed)-> disconnected
//! connected    --connect---------------> connected     (no probe)
//! connected    --disconnect------------> disconnected  (cache cleared)
//! connected    --credentials rejected--> disconnected  (cache cleared)
//! disconnected --disconnect------------> disconnected
//! ```

pub mod client;
pub mod errors;
pub mod http_client;
pub mod manager;

pub use client::{NodeClient, NodeConnector};
pub use errors::{ClassifiedError, ErrorKind, UpstreamError};
pub use http_client::{HttpClientConfig, HttpNodeClient, HttpNodeConnector};
pub use manager::{ConnectionManager, ConnectionState, SessionInfo};
