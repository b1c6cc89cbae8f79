//! Visitor-facing endpoints, resolved by request host.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

use super::{request_host, success, ApiResult};
use crate::errors::AppError;
use crate::models::{find_published, PageStatus, PublishedPage, Site};
use crate::site::{ResolveRequest, Resolution, Strategy};
use crate::AppState;

/// The site serving the current request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSite {
    #[serde(flatten)]
    pub site: Site,
    pub is_active: bool,
    pub resolved_by: Strategy,
}

/// GET /api/site - Resolve the site for the request host.
pub async fn current_site(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<CurrentSite> {
    let resolution = resolve_visitor_site(&state, &headers)
        .await
        .ok_or_else(|| AppError::NotFound("No site configured for this host".to_string()))?;

    let site = state
        .repo
        .get_site(&resolution.site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Site {} not found", resolution.site_id)))?;

    success(CurrentSite {
        is_active: site.is_active(),
        site,
        resolved_by: resolution.source,
    })
}

/// GET /api/pages/:slug - A published page of the host's site, read live.
pub async fn get_published_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> ApiResult<PublishedPage> {
    let not_found = || AppError::NotFound(format!("Page {} not found", slug));

    let resolution = resolve_visitor_site(&state, &headers)
        .await
        .ok_or_else(not_found)?;

    let page = match state.repo.get_page_by_slug(&resolution.site_id, &slug).await {
        Ok(page) => page,
        Err(e) => {
            // Visitors get a plain not-found, never the datastore error
            tracing::warn!("Page lookup for {} failed: {}", slug, e);
            None
        }
    };

    let page = page
        .filter(|p| p.status == PageStatus::Published)
        .ok_or_else(not_found)?;
    success(PublishedPage::new(page))
}

/// GET /static/pages/:slug - A published page served from the pages snapshot.
pub async fn get_static_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<PublishedPage> {
    let pages = state.reader.read_pages().await;
    let page = find_published(&pages, &slug)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Page {} not found", slug)))?;
    success(PublishedPage::new(page))
}

async fn resolve_visitor_site(state: &AppState, headers: &HeaderMap) -> Option<Resolution> {
    let host = request_host(headers);
    let request = ResolveRequest {
        host: host.as_ref(),
        ..ResolveRequest::default()
    };
    state.resolver.find_existing(&request).await
}
