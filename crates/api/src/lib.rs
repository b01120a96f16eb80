//! HTTP API for the Egypt Holiday Makers portal.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
