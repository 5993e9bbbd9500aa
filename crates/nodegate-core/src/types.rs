//! Shared types: session parameters, node RPC methods, and the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message returned by every successful connect, including idempotent repeats.
pub const WELCOME_MESSAGE: &str = "Welcome to the blockchain. Vires in numeris";

/// Message returned for any data query issued without an active session.
pub const NOT_CONNECTED_MESSAGE: &str = "Please connect first";

/// Message returned by a disconnect.
pub const DISCONNECTED_MESSAGE: &str = "Disconnected";

/// Network address of the upstream node's RPC interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// Builds the base URL of the RPC interface.
    #[must_use]
    pub fn url(&self, use_tls: bool) -> String {
        let scheme = if use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}/", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// RPC credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a connect request.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectParams {
    /// Splits the request into the endpoint and credentials halves.
    #[must_use]
    pub fn into_parts(self) -> (Endpoint, Credentials) {
        (Endpoint::new(self.host, self.port), Credentials::new(self.username, self.password))
    }
}

/// Remote operations the gateway issues against the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// Also serves as the liveness probe for a candidate session.
    GetBlockchainInfo,
    GetBlock,
    GetBlockCount,
    GetRawTransaction,
    GetReceivedByAddress,
}

impl RpcMethod {
    /// The node's method name on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetBlockchainInfo => "getblockchaininfo",
            Self::GetBlock => "getblock",
            Self::GetBlockCount => "getblockcount",
            Self::GetRawTransaction => "getrawtransaction",
            Self::GetReceivedByAddress => "getreceivedbyaddress",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP-style status of a gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    BadRequest,
    Unauthorized,
    Internal,
}

impl ResponseStatus {
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Internal => 500,
        }
    }
}

/// Whether a successful response was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
        }
    }
}

/// Status plus JSON body, ready for the transport layer to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: ResponseStatus,
    pub body: Value,
    pub cache_status: Option<CacheStatus>,
}

impl GatewayResponse {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: ResponseStatus::Ok, body, cache_status: None }
    }

    /// A `{ "message": ... }` body with the given status.
    #[must_use]
    pub fn message(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::json!({ "message": message.into() }),
            cache_status: None,
        }
    }

    #[must_use]
    pub fn with_cache_status(mut self, cache_status: CacheStatus) -> Self {
        self.cache_status = Some(cache_status);
        self
    }
}
