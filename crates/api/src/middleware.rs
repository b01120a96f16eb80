use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use ehm_auth::JwtValidator;

use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<AppServices>,
}

fn unauthorized(message: &str) -> ServiceError {
    ServiceError::Unauthorized(format!("Not authorized, {message}"))
}

/// Validate the bearer token, load its user, and attach a [`PrincipalContext`].
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<PrincipalContext, ServiceError> {
    let token = extract_bearer(headers)?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "token rejected");
        unauthorized("token failed")
    })?;

    let user = state
        .services
        .users
        .get(claims.sub)
        .await
        .map_err(|e| ServiceError::server("authenticating", e))?
        .ok_or_else(|| unauthorized("user not found"))?;
    if !user.is_active {
        return Err(unauthorized("account is disabled"));
    }

    Ok(PrincipalContext::from_account(&user))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ServiceError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("no token provided"))?;

    let header = header
        .to_str()
        .map_err(|_| unauthorized("invalid token format"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("no token provided"))?
        .trim();
    if token.is_empty() {
        return Err(unauthorized("invalid token format"));
    }

    Ok(token)
}
