#![allow(dead_code)]

use axum_test::TestServer;
use shortlink_engine::domain::events::ExpirationSignal;
use shortlink_engine::infrastructure::persistence::Repositories;
use shortlink_engine::routes::api_router;
use shortlink_engine::state::{AppState, StateSettings};
use std::time::Duration;
use tokio::sync::mpsc;

pub const BASE_URL: &str = "http://s.test";

/// In-memory state with a running expiration worker.
pub async fn create_test_state() -> AppState {
    AppState::in_memory(BASE_URL).await.unwrap()
}

/// State over the given repositories with a running expiration worker.
pub async fn create_test_state_with(repositories: Repositories) -> AppState {
    let (state, rx) = build(repositories, StateSettings::default()).await;
    state.spawn_expiration_worker(rx);
    state
}

/// State whose expiration signals are not consumed; tests drive them by hand.
pub async fn create_state_without_worker() -> (AppState, mpsc::Receiver<ExpirationSignal>) {
    build(Repositories::in_memory(), StateSettings::default()).await
}

async fn build(
    repositories: Repositories,
    settings: StateSettings,
) -> (AppState, mpsc::Receiver<ExpirationSignal>) {
    let settings = StateSettings {
        base_url: BASE_URL.to_string(),
        ..settings
    };
    AppState::build(repositories, settings, None).await.unwrap()
}

pub async fn create_test_server() -> (TestServer, AppState) {
    let state = create_test_state().await;
    let server = TestServer::new(api_router(state.clone())).unwrap();
    (server, state)
}

/// Polls `check` every 50ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
