use std::sync::Arc;

use axum::{extract::Extension, response::Response, routing::get, Router};

use ehm_auth::Permission;

use crate::app::dto;
use crate::app::errors::{QueryParams, ServiceError};
use crate::app::services::reports::{ReservationReportQuery, StatisticsQuery};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/statistics", get(statistics))
        .route("/reservations", get(reservation_report))
}

pub async fn statistics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<StatisticsQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::REPORTS_READ)?;
    Ok(dto::ok(services.statistics(&q).await?))
}

pub async fn reservation_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<ReservationReportQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::REPORTS_READ)?;
    Ok(dto::counted(services.reservation_report(&q).await?))
}
