//! HTTP surface: routing, shared state and the server loop.

pub mod dto;
pub mod error;
pub mod params;
pub mod tags;
pub mod todos;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::routing::{delete, get, patch};
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{Config, PaginationConfig};
use crate::database::Database;

use self::error::ApiError;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(db: Database, pagination: PaginationConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            pagination,
        }
    }

    /// Exclusive access to the database for the length of one service call
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("Database lock poisoned".to_string()))
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No handler found for this route".to_string())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/api/todos/bulk",
            delete(todos::bulk_delete).patch(todos::bulk_update),
        )
        .route(
            "/api/todos/{id}",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/api/todos/{id}/toggle", patch(todos::toggle_todo))
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/api/tags/{id}", get(tags::get_tag).delete(tags::delete_tag))
        .fallback(not_found)
        .layer(middleware::from_fn(error::render_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config, db: Database) -> std::io::Result<()> {
    let state = AppState::new(db, config.pagination);
    let app = router(state);

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
