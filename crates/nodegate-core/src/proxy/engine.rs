use serde_json::{json, Value};
use std::{fmt, sync::Arc, time::Instant};
use tracing::{debug, info};

use crate::{
    cache::{CacheKey, ImmutableCache},
    config::AppConfig,
    types::{
        CacheStatus, ConnectParams, GatewayResponse, ResponseStatus, RpcMethod,
        DISCONNECTED_MESSAGE, NOT_CONNECTED_MESSAGE,
    },
    upstream::{ConnectionManager, HttpClientConfig, HttpNodeConnector, NodeConnector},
};

use super::errors::GatewayError;

/// External operations the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Health,
    Connect,
    Disconnect,
    GetBlockchainInfo,
    GetBlock,
    GetBlockCount,
    GetRawTransaction,
    GetReceivedByAddress,
}

impl Operation {
    /// Every operation except `connect` and `health` needs an active session.
    #[must_use]
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Health | Self::Connect)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::GetBlockchainInfo => "get-blockchain-info",
            Self::GetBlock => "get-block",
            Self::GetBlockCount => "get-block-count",
            Self::GetRawTransaction => "get-raw-transaction",
            Self::GetReceivedByAddress => "get-received-by-address",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-parsed external request.
#[derive(Debug, Clone)]
pub enum GatewayRequest {
    Health,
    Connect(ConnectParams),
    Disconnect,
    GetBlockchainInfo,
    GetBlock { hash: String },
    GetBlockCount,
    GetRawTransaction { txid: String },
    GetReceivedByAddress { address: String },
}

impl GatewayRequest {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Health => Operation::Health,
            Self::Connect(_) => Operation::Connect,
            Self::Disconnect => Operation::Disconnect,
            Self::GetBlockchainInfo => Operation::GetBlockchainInfo,
            Self::GetBlock { .. } => Operation::GetBlock,
            Self::GetBlockCount => Operation::GetBlockCount,
            Self::GetRawTransaction { .. } => Operation::GetRawTransaction,
            Self::GetReceivedByAddress { .. } => Operation::GetReceivedByAddress,
        }
    }
}

/// Composition root: connection policy, routing and response shaping.
///
/// Built once at startup and shared by reference with every request handler. Holds the
/// single [`ConnectionManager`] and the [`ImmutableCache`] it clears on disconnect.
pub struct Gateway {
    connections: ConnectionManager,
    cache: Arc<ImmutableCache>,
}

impl Gateway {
    #[must_use]
    pub fn new(connector: Arc<dyn NodeConnector>) -> Self {
        let cache = Arc::new(ImmutableCache::new());
        let connections = ConnectionManager::new(connector, Arc::clone(&cache));
        Self { connections, cache }
    }

    /// Builds a gateway that talks to nodes over HTTP with the configured timeouts.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let connector = HttpNodeConnector::new(HttpClientConfig::from(&config.upstream));
        Self::new(Arc::new(connector))
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    #[must_use]
    pub fn cache(&self) -> &ImmutableCache {
        &self.cache
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// Applies the connection guard, dispatches, and shapes the outcome.
    ///
    /// Never fails: every error becomes a `{ "message": ... }` response with its status.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let operation = request.operation();

        if operation.requires_session() && !self.connections.is_connected() {
            debug!(operation = %operation, "rejected, no active session");
            return GatewayResponse::message(ResponseStatus::Unauthorized, NOT_CONNECTED_MESSAGE);
        }

        let start = Instant::now();
        let response = match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(operation = %operation, error = %err, "operation failed");
                err.into_response()
            }
        };
        let latency_ms: u64 = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

        debug!(
            operation = %operation,
            status = response.status.as_u16(),
            cache = ?response.cache_status,
            latency_ms,
            "request handled"
        );

        response
    }

    async fn dispatch(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        match request {
            GatewayRequest::Health => Ok(self.health()),
            GatewayRequest::Connect(params) => self.connect(params).await,
            GatewayRequest::Disconnect => Ok(self.disconnect().await),
            GatewayRequest::GetBlockchainInfo => {
                self.live_query(RpcMethod::GetBlockchainInfo, json!([])).await
            }
            GatewayRequest::GetBlock { hash } => {
                let params = json!([hash, 1]);
                self.cached_query(CacheKey::Block(hash), RpcMethod::GetBlock, params, |_| true)
                    .await
            }
            GatewayRequest::GetBlockCount => {
                self.live_query(RpcMethod::GetBlockCount, json!([])).await
            }
            GatewayRequest::GetRawTransaction { txid } => {
                let params = json!([txid, true]);
                // Only mined transactions are final.
                self.cached_query(
                    CacheKey::Transaction(txid),
                    RpcMethod::GetRawTransaction,
                    params,
                    |tx| tx.get("blockhash").is_some_and(|hash| !hash.is_null()),
                )
                .await
            }
            GatewayRequest::GetReceivedByAddress { address } => {
                self.live_query(RpcMethod::GetReceivedByAddress, json!([address, 1])).await
            }
        }
    }

    fn health(&self) -> GatewayResponse {
        let stats = self.cache.stats();
        let session = self.connections.session_info().map(|info| {
            json!({
                "endpoint": info.endpoint.to_string(),
                "username": info.username,
                "connected_at": info.connected_at.to_rfc3339(),
            })
        });

        GatewayResponse::ok(json!({
            "healthy": true,
            "connection": self.connections.state().as_str(),
            "session": session,
            "cache": {
                "entries": stats.entries,
                "hits": stats.hits,
                "misses": stats.misses,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn connect(&self, params: ConnectParams) -> Result<GatewayResponse, GatewayError> {
        let (endpoint, credentials) = params.into_parts();
        let message =
            self.connections.connect(endpoint, credentials).await.map_err(GatewayError::Connect)?;
        Ok(GatewayResponse::message(ResponseStatus::Ok, message))
    }

    async fn disconnect(&self) -> GatewayResponse {
        self.connections.disconnect().await;
        info!("session closed by request");
        GatewayResponse::message(ResponseStatus::Ok, DISCONNECTED_MESSAGE)
    }

    async fn live_query(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<GatewayResponse, GatewayError> {
        let value = self.connections.invoke(method, params).await.map_err(GatewayError::Query)?;
        Ok(GatewayResponse::ok(value).with_cache_status(CacheStatus::Miss))
    }

    /// Serves `key` from the cache, or fetches it and caches it if `is_final` holds.
    async fn cached_query(
        &self,
        key: CacheKey,
        method: RpcMethod,
        params: Value,
        is_final: impl FnOnce(&Value) -> bool,
    ) -> Result<GatewayResponse, GatewayError> {
        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "served from cache");
            return Ok(GatewayResponse::ok((*cached).clone()).with_cache_status(CacheStatus::Hit));
        }

        let value = self
            .connections
            .invoke_and_cache(key, method, params, is_final)
            .await
            .map_err(GatewayError::Query)?;

        Ok(GatewayResponse::ok(value).with_cache_status(CacheStatus::Miss))
    }
}
