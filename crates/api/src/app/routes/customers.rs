use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};

use ehm_auth::Permission;
use ehm_parties::{CustomerPatch, NewCustomer};

use crate::app::dto;
use crate::app::errors::{JsonBody, QueryParams, Resource, ServiceError};
use crate::app::services::customers::{AdvancedCustomerQuery, CustomerQuery};
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/stats/overview", get(customer_stats))
        .route("/search/advanced", get(advanced_search))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<CustomerQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_READ)?;
    let (items, pagination) = services.list_customers(&q).await?;
    Ok(dto::paged(items, pagination))
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_READ)?;
    let id = parse_id(Resource::Customer, &id)?;
    Ok(dto::ok(services.get_customer(id).await?))
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewCustomer>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_WRITE)?;
    let customer = services
        .create_customer(body, Some(principal.user_id()))
        .await?;
    Ok(dto::created("Customer created successfully", customer))
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CustomerPatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_WRITE)?;
    let id = parse_id(Resource::Customer, &id)?;
    let customer = services.update_customer(id, body).await?;
    Ok(dto::ok_with_message("Customer updated successfully", customer))
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_WRITE)?;
    let id = parse_id(Resource::Customer, &id)?;
    services.delete_customer(id).await?;
    Ok(dto::message("Customer deleted successfully"))
}

pub async fn customer_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_READ)?;
    Ok(dto::ok(services.customer_stats().await?))
}

pub async fn advanced_search(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<AdvancedCustomerQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::CUSTOMERS_READ)?;
    Ok(dto::counted(services.advanced_customer_search(&q).await?))
}
