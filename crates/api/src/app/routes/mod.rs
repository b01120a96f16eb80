use axum::{routing::get, Router};

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod invoices;
pub mod ledgers;
pub mod reports;
pub mod reservations;
pub mod suppliers;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/customers", customers::router())
        .nest("/suppliers", suppliers::router())
        .nest("/reservations", reservations::router())
        .nest("/invoices", invoices::router())
        .nest("/ledgers", ledgers::router())
        .nest("/reports", reports::router())
        .nest("/users", users::router())
}
