//! Session lifecycle: idempotent connect, disconnect, credential loss and concurrency.

use crate::mock_infrastructure::{
    block_hash, body_json, connect_request, create_test_block, get_request, http_app,
    NodeMockBuilder,
};
use axum::http::StatusCode;
use futures::future::join_all;
use nodegate_core::{types::Endpoint, upstream::ConnectionState};
use serial_test::serial;
use tower::ServiceExt;

#[tokio::test]
#[serial]
async fn test_second_connect_does_not_probe() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_blockchain_info(1).await;
    let (app, gateway) = http_app();

    let first = app.clone().oneshot(connect_request(&node.endpoint())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // A different node is ignored while the first session is alive.
    let second =
        app.oneshot(connect_request(&Endpoint::new("192.0.2.1", 8332))).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second.into_body()).await;
    assert_eq!(body["message"], "Welcome to the blockchain. Vires in numeris");

    let info = gateway.connections().session_info().unwrap();
    assert_eq!(info.endpoint, node.endpoint());
    node.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_disconnect_clears_cache() {
    let hash = block_hash(7);
    let block = create_test_block(7, &[]);
    let mut node = NodeMockBuilder::new().await;
    node.mock_blockchain_info(2).await;
    node.mock_get_block(&hash, &block, 2).await;
    let (app, gateway) = http_app();
    let uri = format!("/api/get-block/{hash}");

    app.clone().oneshot(connect_request(&node.endpoint())).await.unwrap();
    app.clone().oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(gateway.cache().len(), 1);

    let response = app.clone().oneshot(get_request("/api/disconnect")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(gateway.cache().is_empty());
    assert_eq!(gateway.connections().state(), ConnectionState::Disconnected);

    let response = app.clone().oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.clone().oneshot(connect_request(&node.endpoint())).await.unwrap();
    let response = app.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.headers()["x-cache-status"], "MISS");

    node.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_rejected_credentials_drop_session() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_blockchain_info(1).await;
    node.mock_unauthorized("getblockcount").await;
    let (app, gateway) = http_app();
    app.clone().oneshot(connect_request(&node.endpoint())).await.unwrap();
    assert!(gateway.is_connected());

    let response = app.clone().oneshot(get_request("/api/get-block-count")).await.unwrap();
    assert!(response.status().is_client_error());
    assert!(!gateway.is_connected());

    let response = app.oneshot(get_request("/api/get-block-count")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["message"], "Please connect first");
}

#[tokio::test]
#[serial]
async fn test_rejected_probe_leaves_disconnected() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_unauthorized("getblockchaininfo").await;
    let (app, gateway) = http_app();

    let response = app.oneshot(connect_request(&node.endpoint())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!gateway.is_connected());
    assert!(gateway.connections().session_info().is_none());
}

#[tokio::test]
#[serial]
async fn test_concurrent_connects_share_one_probe() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_blockchain_info(1).await;
    let (app, gateway) = http_app();
    let endpoint = node.endpoint();

    let responses = join_all(
        (0..8).map(|_| app.clone().oneshot(connect_request(&endpoint))),
    )
    .await;

    for response in responses {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }
    assert!(gateway.is_connected());
    node.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_health_reflects_session() {
    let mut node = NodeMockBuilder::new().await;
    node.mock_blockchain_info(1).await;
    let (app, _) = http_app();

    let body = body_json(app.clone().oneshot(get_request("/api/health")).await.unwrap().into_body()).await;
    assert_eq!(body["connection"], "disconnected");

    app.clone().oneshot(connect_request(&node.endpoint())).await.unwrap();

    let body = body_json(app.oneshot(get_request("/api/health")).await.unwrap().into_body()).await;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["connection"], "connected");
    assert_eq!(body["session"]["username"], "rpcuser");
    assert!(body["session"].get("password").is_none());
}
