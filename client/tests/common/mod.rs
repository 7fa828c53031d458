#![allow(dead_code)]

use std::sync::Arc;

use client::{Client, ClientConfig, SessionStore};
use wiremock::MockServer;

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_base: server.uri(),
        timeout_ms: 2_000,
        ..ClientConfig::default()
    }
}

/// Client against `server` with an in-memory session.
pub fn test_client(server: &MockServer) -> Client {
    Client::with_session(config_for(server), Arc::new(SessionStore::in_memory()))
        .expect("Failed to build client")
}

pub fn test_client_with(config: ClientConfig) -> Client {
    Client::with_session(config, Arc::new(SessionStore::in_memory()))
        .expect("Failed to build client")
}

/// Requests the mock server saw for `path`.
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.url.path() == path)
        .collect()
}

pub fn authorization(req: &wiremock::Request) -> Option<String> {
    req.headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
