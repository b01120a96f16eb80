use std::sync::Arc;

use axum::{extract::Extension, response::Response};

use crate::app::dto;
use crate::app::errors::{JsonBody, ServiceError};
use crate::app::services::users::{LoginRequest, TokenIssuer};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// `POST /api/auth/login`. Public.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ServiceError> {
    let session = services.login(body, &issuer).await?;
    Ok(dto::ok_with_message("Login successful", session))
}

/// `GET /api/auth/me`: the caller's own account.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    let user = services.get_user(principal.user_id()).await?;
    Ok(dto::ok(user.view()))
}
