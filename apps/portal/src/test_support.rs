//! Shared helpers for tests that need a backend or a session.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::api_client::ApiClient;
use crate::clock::SystemClock;
use crate::session::SessionStore;
use crate::storage::MemoryStore;

pub(crate) fn memory_session() -> SessionStore {
    SessionStore::new(Arc::new(SystemClock), Arc::new(MemoryStore::new()))
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(crate) async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub(crate) async fn unused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub(crate) async fn client_for(router: Router, session: SessionStore) -> ApiClient {
    let base = spawn_backend(router).await;
    ApiClient::new(base, Duration::from_secs(5), session).unwrap()
}
