//! HTTP application wiring: router, services and layers.
//!
//! - `services/`: store wiring plus the per-entity operations
//! - `routes/`: HTTP handlers (one file per resource)
//! - `dto.rs`: response envelope and paging helpers
//! - `errors.rs`: error type and its JSON envelope

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Extension, Router};
use chrono::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ehm_auth::Hs256Jwt;
use ehm_infra::PortalConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::users::TokenIssuer;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &PortalConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    if services.ensure_admin(&config.admin).await? {
        info!(email = %config.admin.email, "created initial admin account");
    }

    let jwt = Hs256Jwt::new(config.jwt_secret.as_bytes());
    let issuer = Arc::new(TokenIssuer::new(
        jwt.clone(),
        Duration::hours(config.jwt_ttl_hours),
    ));
    let auth_state = middleware::AuthState {
        jwt: Arc::new(jwt),
        services: services.clone(),
    };

    // Auth runs only on matched protected routes; unknown paths reach the fallback.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let api = Router::new()
        .route("/health", get(routes::system::health))
        .route("/test", get(routes::system::test))
        .route("/auth/login", post(routes::auth::login))
        .merge(protected);

    Ok(Router::new()
        .nest("/api", api)
        .fallback(routes::system::not_found)
        .layer(Extension(services))
        .layer(Extension(issuer))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(&config.cors_origins)),
        ))
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}
