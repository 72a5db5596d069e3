//! Test utilities shared by the integration suites.
//!
//! Spins up the full router on a random local port backed by a migrated
//! in-memory SQLite database.

#![allow(dead_code)]

use anyhow::{Context, Result};
use retail_api::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    server::{AppState, create_app},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const TEST_TOKEN: &str = "integration-token";

/// Configuration pointing at an in-memory database with one operator token.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        operator_tokens: vec![TEST_TOKEN.to_string()],
        ..Default::default()
    }
}

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db(config: &AppConfig) -> Result<DatabaseConnection> {
    let db = init_pool(config).await?;
    run_migrations(&db).await?;
    Ok(db)
}

pub struct TestServerHandle {
    pub base_url: String,
    pub db: DatabaseConnection,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl TestServerHandle {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves the application on `127.0.0.1:0` until the handle is shut down.
pub async fn spawn_test_app(config: AppConfig) -> Result<TestServerHandle> {
    let db = setup_test_db(&config).await?;
    let state = AppState {
        config: Arc::new(config),
        db: db.clone(),
    };
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let join_handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("axum server error")
    });

    ready_rx.await.context("server task to signal readiness")?;

    Ok(TestServerHandle {
        base_url: format!("http://{addr}"),
        db,
        shutdown_tx: Some(shutdown_tx),
        join_handle: Some(join_handle),
    })
}

/// Client that sends the test bearer token on every request.
pub fn authed_client() -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Bearer integration-token"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap_or_default()
}
