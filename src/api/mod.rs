//! REST API module.
//!
//! Thin handlers over the repository, resolver and snapshot generator.

mod content;
mod public;
mod sites;
mod snapshots;

pub use content::*;
pub use public::*;
pub use sites::*;
pub use snapshots::*;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Site;
use crate::site::HostInfo;

/// Header set by proxies and CDNs carrying the visitor-facing host.
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// The host the request was addressed to, preferring the forwarded value.
pub fn request_host(headers: &HeaderMap) -> Option<HostInfo> {
    [FORWARDED_HOST_HEADER, header::HOST.as_str()]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        // A forwarded header may carry a proxy chain; the first entry is the client's
        .filter_map(|value| value.split(',').next())
        .find_map(HostInfo::parse)
}

/// Load a site or fail with NOT_FOUND.
pub(crate) async fn require_site(repo: &Repository, site_id: &str) -> Result<Site, AppError> {
    repo.get_site(site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Site {} not found", site_id)))
}
