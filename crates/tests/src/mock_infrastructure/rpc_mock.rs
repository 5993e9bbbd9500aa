//! Node RPC mock builder.
//!
//! Wraps mockito to answer Bitcoin Core style JSON-RPC calls (`getblock`,
//! `getrawtransaction`, ...) the way a real node does: HTTP 200 with a `result` on success,
//! HTTP 500 with an `error` object on RPC failure, HTTP 401 on bad credentials.

use mockito::{Matcher, Mock, Server, ServerGuard};
use nodegate_core::types::Endpoint;
use serde_json::{json, Value};

/// Builder for mock node RPC responses.
pub struct NodeMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

fn result_body(result: &Value) -> String {
    json!({ "result": result, "error": null, "id": "nodegate" }).to_string()
}

impl NodeMockBuilder {
    /// Creates a new builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Endpoint of the mock node, suitable for a connect request.
    ///
    /// # Panics
    ///
    /// Panics if mockito reports an address without a numeric port.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        let address = self.server.host_with_port();
        let (host, port) = address.rsplit_once(':').expect("mockito address has a port");
        Endpoint::new(host, port.parse().expect("numeric port"))
    }

    /// Mocks `method` returning `result`, expected to be hit exactly `hits` times.
    pub async fn mock_result(&mut self, method: &str, result: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(result_body(result))
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks the `getblockchaininfo` connect probe.
    pub async fn mock_blockchain_info(&mut self, hits: usize) -> &mut Self {
        let info = json!({
            "chain": "regtest",
            "blocks": 101,
            "headers": 101,
            "bestblockhash": crate::mock_infrastructure::block_hash(101),
        });
        self.mock_result("getblockchaininfo", &info, hits).await
    }

    /// Mocks `getblock` for one hash, matching on the hash parameter.
    pub async fn mock_get_block(&mut self, hash: &str, block: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                method_matcher("getblock"),
                Matcher::Regex(format!(r#""params"\s*:\s*\["{hash}""#)),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(result_body(block))
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks an RPC-level failure the way the node reports it: HTTP 500 with an error object.
    pub async fn mock_rpc_error(&mut self, method: &str, code: i32, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": null,
                    "error": { "code": code, "message": message },
                    "id": "nodegate"
                })
                .to_string(),
            )
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Mocks the node rejecting the RPC credentials for `method`.
    pub async fn mock_unauthorized(&mut self, method: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(401)
            .with_body("")
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Asserts every mock was hit the expected number of times.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
