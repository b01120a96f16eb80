use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};

use ehm_auth::{NewUser, Permission, UserPatch};
use ehm_core::UserId;

use crate::app::dto;
use crate::app::errors::{JsonBody, Resource, ServiceError};
use crate::app::services::{parse_id, AppServices};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

fn user_id(raw: &str) -> Result<UserId, ServiceError> {
    let id = parse_id(Resource::User, raw)?;
    Ok(UserId::from_uuid(*id.as_uuid()))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::USERS_MANAGE)?;
    Ok(dto::counted(services.list_users().await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::USERS_MANAGE)?;
    let user = services.get_user(user_id(&id)?).await?;
    Ok(dto::ok(user.view()))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::USERS_MANAGE)?;
    let user = services.create_user(body).await?;
    Ok(dto::created("User created successfully", user))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UserPatch>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::USERS_MANAGE)?;
    let user = services.update_user(user_id(&id)?, body).await?;
    Ok(dto::ok_with_message("User updated successfully", user))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require(&principal, Permission::USERS_MANAGE)?;
    services
        .delete_user(user_id(&id)?, principal.user_id())
        .await?;
    Ok(dto::message("User deleted successfully"))
}
