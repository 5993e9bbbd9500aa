use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    borrow::Cow,
    error::Error as StdError,
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    config::UpstreamSettings,
    types::{Credentials, Endpoint, RpcMethod},
    upstream::{
        client::{NodeClient, NodeConnector},
        errors::UpstreamError,
    },
};

/// Bodies longer than this are truncated before being kept in an error.
const MAX_ERROR_BODY_LEN: usize = 256;

/// Timeout and transport settings shared by every client the connector builds.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total time allowed for one RPC call.
    pub request_timeout: Duration,
    /// Time allowed to establish the TCP connection.
    pub connect_timeout: Duration,
    /// Talk to the node over HTTPS instead of plain HTTP.
    pub use_tls: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            use_tls: false,
        }
    }
}

impl From<&UpstreamSettings> for HttpClientConfig {
    fn from(settings: &UpstreamSettings) -> Self {
        Self {
            request_timeout: Duration::from_secs(settings.timeout_seconds),
            connect_timeout: Duration::from_secs(settings.connect_timeout_seconds),
            use_tls: settings.use_tls,
        }
    }
}

/// Builds [`HttpNodeClient`]s speaking JSON-RPC over HTTP with basic auth.
#[derive(Debug, Clone, Default)]
pub struct HttpNodeConnector {
    config: HttpClientConfig,
}

impl HttpNodeConnector {
    #[must_use]
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }
}

impl NodeConnector for HttpNodeConnector {
    fn build(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Arc<dyn NodeClient>, UpstreamError> {
        let client = HttpNodeClient::new(endpoint, credentials, &self.config)?;
        Ok(Arc::new(client))
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcReplyError>,
}

#[derive(Deserialize)]
struct RpcReplyError {
    code: i32,
    message: String,
}

/// JSON-RPC client bound to one node endpoint and one set of credentials.
pub struct HttpNodeClient {
    client: Client,
    url: String,
    credentials: Credentials,
    next_id: AtomicU64,
}

impl HttpNodeClient {
    /// Creates a client without contacting the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new(
        endpoint: &Endpoint,
        credentials: &Credentials,
        config: &HttpClientConfig,
    ) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("nodegate/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::Transport {
                    code: Cow::Borrowed("ECLIENT"),
                    detail: format!("HTTP client build failed: {e}"),
                }
            })?;

        Ok(Self {
            client,
            url: endpoint.url(config.use_tls),
            credentials: credentials.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Maps a reqwest failure to a raw error with an errno-style code.
    ///
    /// Walks the source chain for the underlying I/O error. A peer that closes the connection
    /// before answering surfaces as a hyper error with no I/O source and is reported as
    /// `ECONNRESET`. Anything else falls back to a coarse code.
    fn transport_error(error: &reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            return UpstreamError::Timeout;
        }

        let mut source: Option<&(dyn StdError + 'static)> = error.source();
        while let Some(err) = source {
            if let Some(io_error) = err.downcast_ref::<io::Error>() {
                return UpstreamError::from_io(io_error);
            }
            if let Some(hyper_error) = err.downcast_ref::<hyper::Error>() {
                if Self::is_peer_hang_up(hyper_error) {
                    return UpstreamError::Transport {
                        code: Cow::Borrowed("ECONNRESET"),
                        detail: error.to_string(),
                    };
                }
            }
            source = err.source();
        }

        let code = if error.is_connect() { "ECONNFAILED" } else { "ENETWORK" };
        UpstreamError::Transport { code: Cow::Borrowed(code), detail: error.to_string() }
    }

    fn is_peer_hang_up(error: &hyper::Error) -> bool {
        error.is_incomplete_message() || error.is_closed() || error.is_canceled()
    }

    fn truncate(body: String) -> String {
        if body.len() > MAX_ERROR_BODY_LEN {
            let mut end = MAX_ERROR_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated)", &body[..end])
        } else {
            body
        }
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn call(&self, method: RpcMethod, params: Value) -> Result<Value, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest { jsonrpc: "1.0", id, method: method.as_str(), params: &params };

        tracing::trace!(url = %self.url, method = %method, id, "sending rpc request");

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Self::transport_error(&e))?;

        let reply = match serde_json::from_str::<RpcReply>(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(UpstreamError::HttpError(status.as_u16(), Self::truncate(body)));
            }
            Err(e) => return Err(UpstreamError::InvalidResponse(format!("malformed reply: {e}"))),
        };

        // The node reports RPC faults with a non-2xx status and a JSON-RPC error body.
        match reply.error {
            Some(error) => Err(UpstreamError::RpcError(error.code, error.message)),
            None if status.is_success() => Ok(reply.result),
            None => Err(UpstreamError::HttpError(status.as_u16(), Self::truncate(body))),
        }
    }
}
