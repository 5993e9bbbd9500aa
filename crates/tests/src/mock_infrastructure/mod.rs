//! Mock infrastructure for gateway tests.
//!
//! ## Components
//!
//! - `NodeMockBuilder`: mockito-backed node speaking JSON-RPC over HTTP
//! - `FailingConnector`: connector whose every session fails with a fixed transport code
//! - Fixture helpers for blocks, transactions and connect bodies
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{connect_body, NodeMockBuilder};
//!
//! let mut node = NodeMockBuilder::new().await;
//! node.mock_blockchain_info(1).await;
//! let body = connect_body(&node.endpoint());
//! ```

pub mod rpc_mock;

pub use rpc_mock::NodeMockBuilder;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use nodegate_core::{
    config::AppConfig,
    proxy::Gateway,
    types::{Credentials, Endpoint, RpcMethod},
    upstream::{NodeClient, NodeConnector, UpstreamError},
};
use serde_json::{json, Value};
use std::{borrow::Cow, sync::Arc};

/// Connector whose sessions fail every call with one transport error code.
pub struct FailingConnector {
    code: &'static str,
}

impl FailingConnector {
    #[must_use]
    pub fn new(code: &'static str) -> Self {
        Self { code }
    }
}

struct FailingClient {
    code: &'static str,
}

#[async_trait]
impl NodeClient for FailingClient {
    async fn call(&self, _method: RpcMethod, _params: Value) -> Result<Value, UpstreamError> {
        Err(UpstreamError::Transport {
            code: Cow::Borrowed(self.code),
            detail: format!("simulated {}", self.code),
        })
    }
}

impl NodeConnector for FailingConnector {
    fn build(
        &self,
        _endpoint: &Endpoint,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn NodeClient>, UpstreamError> {
        Ok(Arc::new(FailingClient { code: self.code }))
    }
}

/// Gateway wired to real HTTP clients with short timeouts, plus its router.
#[must_use]
pub fn http_app() -> (Router, Arc<Gateway>) {
    let mut config = AppConfig::default();
    config.upstream.timeout_seconds = 5;
    config.upstream.connect_timeout_seconds = 2;

    let gateway = Arc::new(Gateway::from_config(&config));
    (server::router::create_router(gateway.clone(), &config), gateway)
}

/// Router over a gateway using `connector`.
#[must_use]
pub fn app_with_connector(connector: Arc<dyn NodeConnector>) -> (Router, Arc<Gateway>) {
    let gateway = Arc::new(Gateway::new(connector));
    (server::router::create_router(gateway.clone(), &AppConfig::default()), gateway)
}

/// JSON body of a connect request for `endpoint`.
#[must_use]
pub fn connect_body(endpoint: &Endpoint) -> Value {
    json!({
        "host": endpoint.host,
        "port": endpoint.port,
        "username": "rpcuser",
        "password": "rpcpassword",
    })
}

/// Builds a `POST /api/connect` request.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn connect_request(endpoint: &Endpoint) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/connect")
        .header("content-type", "application/json")
        .body(Body::from(connect_body(endpoint).to_string()))
        .expect("valid connect request")
}

/// Builds a `GET` request for `uri`.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("valid GET request")
}

/// Reads a response body as JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
pub async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Deterministic 64-hex-digit block hash for `height`.
#[must_use]
pub fn block_hash(height: u64) -> String {
    format!("{height:064x}")
}

/// Verbose (`verbosity = 1`) block fixture.
#[must_use]
pub fn create_test_block(height: u64, txids: &[String]) -> Value {
    json!({
        "hash": block_hash(height),
        "confirmations": 1,
        "height": height,
        "version": 536_870_912,
        "merkleroot": format!("{:064x}", height * 7),
        "tx": txids,
        "time": 1_700_000_000 + height,
        "nTx": txids.len(),
        "previousblockhash": block_hash(height.saturating_sub(1)),
    })
}

/// Verbose transaction fixture; `blockhash` is omitted for mempool transactions.
#[must_use]
pub fn create_test_transaction(txid: &str, blockhash: Option<&str>) -> Value {
    let mut tx = json!({
        "txid": txid,
        "hash": txid,
        "version": 2,
        "size": 225,
        "vin": [],
        "vout": [{ "value": 0.5, "n": 0 }],
    });
    if let Some(hash) = blockhash {
        tx["blockhash"] = json!(hash);
        tx["confirmations"] = json!(1);
    }
    tx
}
