//! Service error type and its HTTP envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use ehm_core::{DomainError, FieldError};
use ehm_infra::{StoreError, UniqueKey};

/// The record kind an operation works on; drives user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Customer,
    Supplier,
    Reservation,
    Invoice,
    Ledger,
    User,
}

impl Resource {
    pub fn label(self) -> &'static str {
        match self {
            Resource::Customer => "Customer",
            Resource::Supplier => "Supplier",
            Resource::Reservation => "Reservation",
            Resource::Invoice => "Invoice",
            Resource::Ledger => "Ledger",
            Resource::User => "User",
        }
    }

    pub fn duplicate_message(self, key: UniqueKey) -> String {
        match (self, key) {
            (Resource::User, _) => "User with this email already exists".to_string(),
            (Resource::Reservation, UniqueKey::Code) => {
                "Reservation number already exists".to_string()
            }
            (Resource::Invoice, UniqueKey::Code) => "Invoice number already exists".to_string(),
            (r, UniqueKey::Code) => format!("{} code already exists", r.label()),
            (r, UniqueKey::Email | UniqueKey::Phone) => {
                format!("{} with this email or telephone already exists", r.label())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    /// Duplicate contact or code; reported as 400.
    #[error("{0}")]
    Conflict(String),

    #[error("{} not found", .0.label())]
    NotFound(Resource),

    /// No route matched the request.
    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("server error while {action}: {detail}")]
    Server { action: String, detail: String },
}

impl ServiceError {
    pub fn server(action: impl Into<String>, detail: impl core::fmt::Display) -> Self {
        ServiceError::Server {
            action: action.into(),
            detail: detail.to_string(),
        }
    }

    /// Map a store failure, attributing duplicates and misses to `resource`.
    pub fn store(resource: Resource, action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::Duplicate(key) => ServiceError::Conflict(resource.duplicate_message(key)),
            StoreError::NotFound => ServiceError::NotFound(resource),
            other => ServiceError::server(action, other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) | ServiceError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) | ServiceError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidFields(fields) => ServiceError::Validation(fields),
            DomainError::InvalidId(msg) => ServiceError::BadRequest(msg),
            DomainError::NotFound => ServiceError::BadRequest("Referenced record not found".to_string()),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ServiceError::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors,
            }),
            ServiceError::Server { action, detail } => {
                tracing::error!(%action, %detail, "request failed");
                json!({ "success": false, "message": format!("Server error while {action}") })
            }
            other => json!({ "success": false, "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ServiceError {
    ServiceError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
}

/// `Query` extractor whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection: QueryRejection| {
                ServiceError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_messages_name_the_entity() {
        assert_eq!(
            Resource::Customer.duplicate_message(UniqueKey::Phone),
            "Customer with this email or telephone already exists"
        );
        assert_eq!(
            Resource::Supplier.duplicate_message(UniqueKey::Code),
            "Supplier code already exists"
        );
        assert_eq!(
            Resource::Ledger.duplicate_message(UniqueKey::Code),
            "Ledger code already exists"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ServiceError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::NotFound(Resource::Invoice).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::server("fetching invoices", "boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::NotFound(Resource::Invoice).to_string(),
            "Invoice not found"
        );
        let missing = ServiceError::RouteNotFound {
            method: "GET".into(),
            path: "/api/nope".into(),
        };
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Route GET /api/nope not found");
    }

    #[test]
    fn store_errors_are_attributed() {
        let err = ServiceError::store(Resource::Supplier, "creating supplier")(StoreError::Duplicate(
            UniqueKey::Email,
        ));
        assert!(matches!(err, ServiceError::Conflict(m) if m.starts_with("Supplier with")));

        let err = ServiceError::store(Resource::Supplier, "creating supplier")(StoreError::Backend(
            "down".into(),
        ));
        assert!(matches!(err, ServiceError::Server { action, .. } if action == "creating supplier"));
    }
}
