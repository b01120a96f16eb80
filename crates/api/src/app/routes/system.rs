use std::sync::Arc;

use axum::{
    extract::{Extension, OriginalUri},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::app::errors::ServiceError;
use crate::app::services::AppServices;

pub const SERVICE_NAME: &str = "Egypt Holiday Makers Portal";
pub const API_VERSION: &str = "1.0.0";

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    Json(json!({
        "status": "OK",
        "service": SERVICE_NAME,
        "database": services.backend.status(),
        "timestamp": Utc::now(),
    }))
    .into_response()
}

pub async fn test() -> Response {
    Json(json!({
        "success": true,
        "message": format!("{SERVICE_NAME} API is running!"),
        "version": API_VERSION,
        "timestamp": Utc::now(),
    }))
    .into_response()
}

/// Fallback for anything no route matched.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ServiceError {
    ServiceError::RouteNotFound {
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string()),
    }
}
