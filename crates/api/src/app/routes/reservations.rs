use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};

use ehm_auth::Permission;
use ehm_bookings::{NewReservation, ReservationPatch};

use crate::app::dto;
use crate::app::errors::{JsonBody, QueryParams, Resource, ServiceError};
use crate::app::services::reservations::ReservationQuery;
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reservations).post(create_reservation))
        .route(
            "/:id",
            get(get_reservation)
                .put(update_reservation)
                .delete(delete_reservation),
        )
}

pub async fn list_reservations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(q): QueryParams<ReservationQuery>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::RESERVATIONS_READ)?;
    let (items, pagination) = services.list_reservations(&q).await?;
    Ok(dto::paged(items, pagination))
}

pub async fn get_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::RESERVATIONS_READ)?;
    let id = parse_id(Resource::Reservation, &id)?;
    Ok(dto::ok(services.reservation_detail(id).await?))
}

pub async fn create_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewReservation>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::RESERVATIONS_WRITE)?;
    let reservation = services
        .create_reservation(body, Some(principal.user_id()))
        .await?;
    Ok(dto::created("Reservation created successfully", reservation))
}

pub async fn update_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ReservationPatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::RESERVATIONS_WRITE)?;
    let id = parse_id(Resource::Reservation, &id)?;
    let reservation = services.update_reservation(id, body).await?;
    Ok(dto::ok_with_message("Reservation updated successfully", reservation))
}

pub async fn delete_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::RESERVATIONS_WRITE)?;
    let id = parse_id(Resource::Reservation, &id)?;
    services.delete_reservation(id).await?;
    Ok(dto::message("Reservation deleted successfully"))
}
