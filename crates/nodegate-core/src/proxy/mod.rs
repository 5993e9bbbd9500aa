//! Gateway orchestration: connection policy, routing and response shaping.
//!
//! # Request Processing Flow
//!
//! ```text
//! GatewayRequest
//!       │
//!       ▼
//! ┌──────────────────┐
//! │ requires session │ ─── and not connected ──► 401 "Please connect first"
//! └────────┬─────────┘
//!          │
//!    ┌─────┴──────┬───────────────┬──────────────┐
//!    ▼            ▼               ▼              ▼
//! health      connect/        get-block /     live queries
//!             disconnect      get-raw-tx
//!    │            │               │              │
//!    ▼            ▼               ▼              ▼
//! local       Connection      Cache check    Connection
//! report      Manager         then invoke    Manager invoke
//! ```
//!
//! # Caching Policy
//!
//! | Operation | Key | Cached when |
//! |-----------|-----|-------------|
//! | `get-block` | block hash | always |
//! | `get-raw-transaction` | txid | the node reports a `blockhash` |
//! | everything else | n/a | never |

pub mod engine;
pub mod errors;

pub use engine::{Gateway, GatewayRequest, Operation};
pub use errors::GatewayError;
