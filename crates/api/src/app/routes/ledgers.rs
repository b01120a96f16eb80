use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};

use ehm_accounting::{LedgerPatch, NewLedgerAccount};
use ehm_auth::Permission;

use crate::app::dto;
use crate::app::errors::{JsonBody, QueryParams, Resource, ServiceError};
use crate::app::services::ledgers::LedgerQuery;
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_ledgers).post(create_ledger))
        .route(
            "/:id",
            get(get_ledger).put(update_ledger).delete(delete_ledger),
        )
}

pub async fn list_ledgers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<LedgerQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::LEDGERS_READ)?;
    Ok(dto::ok(services.list_ledgers(&q).await?))
}

pub async fn get_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::LEDGERS_READ)?;
    let id = parse_id(Resource::Ledger, &id)?;
    Ok(dto::ok(services.get_ledger(id).await?))
}

pub async fn create_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewLedgerAccount>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::LEDGERS_WRITE)?;
    let ledger = services.create_ledger(body, Some(principal.user_id())).await?;
    Ok(dto::created("Ledger created successfully", ledger))
}

pub async fn update_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<LedgerPatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::LEDGERS_WRITE)?;
    let id = parse_id(Resource::Ledger, &id)?;
    let ledger = services.update_ledger(id, body).await?;
    Ok(dto::ok_with_message("Ledger updated successfully", ledger))
}

pub async fn delete_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::LEDGERS_WRITE)?;
    let id = parse_id(Resource::Ledger, &id)?;
    services.delete_ledger(id).await?;
    Ok(dto::message("Ledger deleted successfully"))
}
