//! Operator HTTP control surface.

pub mod server;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::GlobalConfig;
use crate::dispatch::dispatcher::BroadcastDispatcher;
use crate::persistence::SqlitePool;
use crate::provider::catalog::TemplateCatalog;
use crate::provider::client::GraphClient;
use crate::AppError;

/// Shared state handed to every route.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` connection pool.
    pub db: Arc<SqlitePool>,
    /// Cached template catalog.
    pub catalog: Arc<TemplateCatalog>,
    /// Broadcast dispatcher and its progress publisher.
    pub dispatcher: BroadcastDispatcher,
    /// Provider client used for health checks (absent in tests).
    pub provider: Option<Arc<GraphClient>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Db(_) | Self::Provider(_) | Self::Http(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}
