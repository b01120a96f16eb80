use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Path},
    extract::multipart::MultipartRejection,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use ehm_auth::Permission;
use ehm_infra::spreadsheet::XLSX_CONTENT_TYPE;
use ehm_parties::{NewSupplier, SupplierPatch};

use crate::app::dto;
use crate::app::errors::{JsonBody, QueryParams, Resource, ServiceError};
use crate::app::services::suppliers::SupplierQuery;
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/stats/overview", get(supplier_stats))
        .route("/export/excel", get(export_suppliers))
        .route("/import/excel", post(import_suppliers))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<SupplierQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_READ)?;
    let (items, pagination) = services.list_suppliers(&q).await?;
    Ok(dto::paged(items, pagination))
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_READ)?;
    let id = parse_id(Resource::Supplier, &id)?;
    Ok(dto::ok(services.get_supplier(id).await?))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewSupplier>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_WRITE)?;
    let supplier = services
        .create_supplier(body, Some(principal.user_id()))
        .await?;
    Ok(dto::created("Supplier created successfully", supplier))
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SupplierPatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_WRITE)?;
    let id = parse_id(Resource::Supplier, &id)?;
    let supplier = services.update_supplier(id, body).await?;
    Ok(dto::ok_with_message("Supplier updated successfully", supplier))
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_WRITE)?;
    let id = parse_id(Resource::Supplier, &id)?;
    services.delete_supplier(id).await?;
    Ok(dto::message("Supplier deleted successfully"))
}

pub async fn supplier_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_READ)?;
    Ok(dto::ok(services.supplier_stats().await?))
}

pub async fn export_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_READ)?;
    let workbook = services.export_suppliers().await?;
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=suppliers.xlsx"),
        ],
        workbook,
    )
        .into_response())
}

fn unreadable_upload(err: MultipartError) -> ServiceError {
    ServiceError::BadRequest(err.body_text())
}

/// Multipart upload with the workbook in the `file` field.
pub async fn import_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    upload: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::SUPPLIERS_WRITE)?;
    let no_file = || ServiceError::BadRequest("No file uploaded".to_string());
    let mut multipart = upload.map_err(|_| no_file())?;

    let mut workbook = None;
    while let Some(field) = multipart.next_field().await.map_err(unreadable_upload)? {
        if field.name() == Some("file") {
            workbook = Some(field.bytes().await.map_err(unreadable_upload)?);
            break;
        }
    }
    let workbook = workbook.ok_or_else(no_file)?;

    let summary = services
        .import_suppliers(&workbook, Some(principal.user_id()))
        .await?;
    Ok(dto::ok_with_message(
        format!("Imported {} suppliers successfully", summary.imported),
        summary,
    ))
}
