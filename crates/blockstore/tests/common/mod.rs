//! Common helpers for integration tests against a mocked HTTP gateway.

#![allow(dead_code)]

use std::sync::Arc;

use blockstore::{ConnectionManager, TransportMode};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Access token carried in the manager URL.
pub const TOKEN: &str = "tok";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("blockstore=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

/// Gateway path behind the token prefix, e.g. `/tok/v1/multichain/consumer/next`.
pub fn path(route: &str) -> String {
    format!("/{}{}", TOKEN, route)
}

pub fn manager(server: &ServerGuard) -> Arc<ConnectionManager> {
    let url = format!("{}/{}", server.url(), TOKEN);
    Arc::new(ConnectionManager::new(url, TransportMode::Http).unwrap())
}

/// POST `route` answering 200 with `reply`, matching requests whose JSON body contains `request`.
pub async fn mock_json(server: &mut ServerGuard, route: &str, request: Value, reply: Value) -> Mock {
    server
        .mock("POST", path(route).as_str())
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(request))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply.to_string())
        .create_async()
        .await
}

/// Protobuf-JSON block header (heights as strings and hashes as base64, like the gateway
/// sends them). Every header carries hash `abcd`.
pub fn header(height: u64) -> Value {
    serde_json::json!({
        "blockchainName": "eth",
        "blockHeight": height.to_string(),
        "blockHash": "q80=",
        "parentHash": "",
        "timestamp": "1650000000",
    })
}

pub fn block(height: u64) -> Value {
    serde_json::json!({ "header": header(height), "transactions": [] })
}

pub fn consumer_json(name: &str) -> Value {
    serde_json::json!({ "consumerName": name, "userId": TOKEN, "blockchainName": "eth" })
}
