//! # Nodegate Core
//!
//! Core library for the nodegate full-node gateway.
//!
//! - **[`upstream`]**: The single upstream session. [`upstream::ConnectionManager`] owns the
//!   connect/disconnect state machine and is the only component that talks to the node.
//!   [`upstream::errors`] classifies raw transport failures into a closed [`ErrorKind`] set.
//!
//! - **[`cache`]**: Write-once storage for entities that never change once they exist
//!   (blocks by hash, mined transactions by id).
//!
//! - **[`proxy`]**: The [`proxy::Gateway`] composition root. Enforces the "connect first"
//!   policy, routes cacheable lookups through the cache, and shapes every outcome into a
//!   status plus JSON body.
//!
//! - **[`config`]**: Layered application configuration.
//!
//! ## Request Flow
//!
//! ```text
//! External Request
//!       │
//!       ▼
//! ┌──────────────┐
//! │ Connected?   │ ─── No (not connect/health) ──► 401 "Please connect first"
//! └──────┬───────┘
//!        │ Yes
//!        ▼
//! ┌──────────────┐
//! │ Cacheable?   │ ─── Hit ──► Cached Response
//! └──────┬───────┘
//!        │ Miss / live query
//!        ▼
//! ┌───────────────────┐
//! │ ConnectionManager │ ─── Failure ──► ErrorClassifier ──► 400/401
//! └────────┬──────────┘
//!          │
//!          ▼
//!   Cache Insert (immutable only)
//!          │
//!          ▼
//!   Response to Client
//! ```
//!
//! [`ErrorKind`]: upstream::errors::ErrorKind

pub mod cache;
pub mod config;
pub mod proxy;
pub mod types;
pub mod upstream;
