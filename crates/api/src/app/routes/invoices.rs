use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};

use ehm_auth::Permission;
use ehm_invoicing::{InvoicePatch, NewInvoice};

use crate::app::dto;
use crate::app::errors::{JsonBody, QueryParams, Resource, ServiceError};
use crate::app::services::invoices::InvoiceQuery;
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<InvoiceQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::INVOICES_READ)?;
    let (items, pagination) = services.list_invoices(&q).await?;
    Ok(dto::paged(items, pagination))
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::INVOICES_READ)?;
    let id = parse_id(Resource::Invoice, &id)?;
    Ok(dto::ok(services.get_invoice(id).await?))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewInvoice>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::INVOICES_WRITE)?;
    let invoice = services
        .create_invoice(body, Some(principal.user_id()))
        .await?;
    Ok(dto::created("Invoice created successfully", invoice))
}

pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<InvoicePatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::INVOICES_WRITE)?;
    let id = parse_id(Resource::Invoice, &id)?;
    let invoice = services.update_invoice(id, body).await?;
    Ok(dto::ok_with_message("Invoice updated successfully", invoice))
}

pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::INVOICES_WRITE)?;
    let id = parse_id(Resource::Invoice, &id)?;
    services.delete_invoice(id).await?;
    Ok(dto::message("Invoice deleted successfully"))
}
