use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nodegate_core::{
    config::AppConfig,
    proxy::{Gateway, GatewayError, GatewayRequest},
    types::{ConnectParams, GatewayResponse, NOT_CONNECTED_MESSAGE},
};
use serde_json::json;
use std::{any::Any, sync::Arc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::error;

use crate::middleware::{create_request_id_layers, request_span};

/// Response header reporting whether a query was served from the cache.
pub const X_CACHE_STATUS: &str = "x-cache-status";

type GatewayState = State<Arc<Gateway>>;

/// Builds the full HTTP application: every route under `server.base_path` plus the
/// transport layers.
pub fn create_router(gateway: Arc<Gateway>, config: &AppConfig) -> Router {
    let routes = Router::new()
        .route("/health", get(handle_health))
        .route("/connect", post(handle_connect))
        .route("/disconnect", get(handle_disconnect))
        .route("/get-blockchain-info", get(handle_get_blockchain_info))
        .route("/get-block/{blockhash}", get(handle_get_block))
        .route("/get-block-count", get(handle_get_block_count))
        .route("/get-raw-transaction/{txid}", get(handle_get_raw_transaction))
        .route("/get-received-by-address/{address}", get(handle_get_received_by_address));

    let base_path = config.server.base_path.trim_end_matches('/');
    let app = if base_path.is_empty() { routes } else { Router::new().nest(base_path, routes) };

    let (set_request_id, propagate_request_id) = create_request_id_layers();

    // Layers are applied in reverse order: the request ID is set before anything else runs.
    // `Router::layer` wraps each route separately, so the limit must share one semaphore.
    app.fallback(handle_not_found)
        .with_state(gateway)
        .layer(GlobalConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_span::<axum::body::Body>))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// Converts a gateway outcome into an HTTP response, tagging cacheable reads.
fn into_http(response: GatewayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (status, Json(response.body)).into_response();

    if let Some(cache_status) = response.cache_status {
        if let Ok(value) = HeaderValue::from_str(&cache_status.to_string()) {
            http.headers_mut().insert(X_CACHE_STATUS, value);
        }
    }

    http
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

pub async fn handle_health(State(gateway): GatewayState) -> Response {
    into_http(gateway.handle(GatewayRequest::Health).await)
}

/// Opens the node session. Body: `{ host, port, username, password }`.
pub async fn handle_connect(
    State(gateway): GatewayState,
    payload: Result<Json<ConnectParams>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(params)) => into_http(gateway.handle(GatewayRequest::Connect(params)).await),
        Err(rejection) => {
            let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            message(status, rejection.body_text())
        }
    }
}

pub async fn handle_disconnect(State(gateway): GatewayState) -> Response {
    into_http(gateway.handle(GatewayRequest::Disconnect).await)
}

pub async fn handle_get_blockchain_info(State(gateway): GatewayState) -> Response {
    into_http(gateway.handle(GatewayRequest::GetBlockchainInfo).await)
}

pub async fn handle_get_block(
    State(gateway): GatewayState,
    Path(hash): Path<String>,
) -> Response {
    into_http(gateway.handle(GatewayRequest::GetBlock { hash }).await)
}

pub async fn handle_get_block_count(State(gateway): GatewayState) -> Response {
    into_http(gateway.handle(GatewayRequest::GetBlockCount).await)
}

pub async fn handle_get_raw_transaction(
    State(gateway): GatewayState,
    Path(txid): Path<String>,
) -> Response {
    into_http(gateway.handle(GatewayRequest::GetRawTransaction { txid }).await)
}

pub async fn handle_get_received_by_address(
    State(gateway): GatewayState,
    Path(address): Path<String>,
) -> Response {
    into_http(gateway.handle(GatewayRequest::GetReceivedByAddress { address }).await)
}

/// Unknown paths are still behind the connection guard.
async fn handle_not_found(State(gateway): GatewayState) -> Response {
    if gateway.is_connected() {
        message(StatusCode::NOT_FOUND, "Not found")
    } else {
        message(StatusCode::UNAUTHORIZED, NOT_CONNECTED_MESSAGE)
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(detail = %detail, "request handler panicked");
    into_http(GatewayError::Internal(detail).into_response())
}
