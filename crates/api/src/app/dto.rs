//! Response envelope and shared request DTOs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use ehm_infra::store::Page;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// `{success, message?, data?, pagination?}` response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T: Serialize> Envelope<T> {
    fn with(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            total: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(params: &PageParams, total: u64) -> Self {
        let limit = params.limit();
        Self {
            current_page: params.page(),
            total_pages: total.div_ceil(limit),
            total,
            limit,
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope::with(data)).into_response()
}

pub fn ok_with_message<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    let mut env = Envelope::with(data);
    env.message = Some(message.into());
    Json(env).into_response()
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    let mut env = Envelope::with(data);
    env.message = Some(message.into());
    (StatusCode::CREATED, Json(env)).into_response()
}

pub fn message(message: impl Into<String>) -> Response {
    Json(Envelope::<JsonValue> {
        success: true,
        message: Some(message.into()),
        data: None,
        pagination: None,
        total: None,
    })
    .into_response()
}

pub fn paged<T: Serialize>(data: Vec<T>, pagination: Pagination) -> Response {
    let mut env = Envelope::with(data);
    env.pagination = Some(pagination);
    Json(env).into_response()
}

/// `{success, data, total}` for capped, unpaginated result sets.
pub fn counted<T: Serialize>(data: Vec<T>) -> Response {
    let total = data.len() as u64;
    let mut env = Envelope::with(data);
    env.total = Some(total);
    Json(env).into_response()
}

/// `page`/`limit` query parameters (1-based page).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn window(&self) -> Page {
        Page::numbered(self.page(), self.limit())
    }
}

/// Blank query values count as absent.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
