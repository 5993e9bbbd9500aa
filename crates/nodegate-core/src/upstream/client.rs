use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    types::{Credentials, Endpoint, RpcMethod},
    upstream::errors::UpstreamError,
};

/// Handle to a node offering named remote operations.
///
/// Implementations must be safe to call concurrently; the connection manager hands one
/// handle to every in-flight query.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Issues `method` with positional `params` and returns the node's `result` value.
    ///
    /// # Errors
    ///
    /// Returns the raw [`UpstreamError`] reported by the transport or the node.
    async fn call(&self, method: RpcMethod, params: Value) -> Result<Value, UpstreamError>;
}

/// Builds candidate [`NodeClient`]s for a connect attempt.
///
/// Building a client must not touch the network; liveness is established separately by the
/// connection manager's probe.
pub trait NodeConnector: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed (e.g. invalid TLS setup).
    fn build(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Arc<dyn NodeClient>, UpstreamError>;
}
