use std::sync::Arc;

use axum::{extract::Extension, response::Response};

use ehm_auth::Permission;

use crate::app::dto;
use crate::app::errors::ServiceError;
use crate::app::services::reports::DashboardUser;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::REPORTS_READ)?;
    let user = DashboardUser {
        name: principal.name().to_string(),
        email: principal.email().to_string(),
        role: principal.role().as_str().to_string(),
    };
    Ok(dto::ok(services.dashboard(user).await?))
}
