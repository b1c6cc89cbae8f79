//! Per-site content endpoints.
//!
//! Every route is scoped by the site id in the path.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_site, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateNavigationItemRequest, CreatePageRequest, CreateTemplateRequest, NavigationItem, Page,
    Template, UpdatePageStatusRequest,
};
use crate::AppState;

/// GET /api/sites/:id/pages - List a site's pages.
pub async fn list_pages(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<Vec<Page>> {
    require_site(&state.repo, &site_id).await?;
    success(state.repo.list_pages(&site_id).await?)
}

/// POST /api/sites/:id/pages - Create a page.
pub async fn create_page(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Json(request): Json<CreatePageRequest>,
) -> ApiResult<Page> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if !is_valid_slug(&request.slug) {
        return Err(AppError::Validation(format!(
            "Invalid slug {:?}: use lowercase letters, digits and dashes",
            request.slug
        )));
    }

    require_site(&state.repo, &site_id).await?;
    success(state.repo.create_page(&site_id, &request).await?)
}

/// PUT /api/sites/:id/pages/:page_id/status - Publish or unpublish a page.
pub async fn update_page_status(
    State(state): State<AppState>,
    Path((site_id, page_id)): Path<(String, String)>,
    Json(request): Json<UpdatePageStatusRequest>,
) -> ApiResult<Page> {
    success(
        state
            .repo
            .set_page_status(&site_id, &page_id, request.status)
            .await?,
    )
}

/// DELETE /api/sites/:id/pages/:page_id - Delete a page.
pub async fn delete_page(
    State(state): State<AppState>,
    Path((site_id, page_id)): Path<(String, String)>,
) -> ApiResult<()> {
    state.repo.delete_page(&site_id, &page_id).await?;
    success(())
}

/// GET /api/sites/:id/navigation - List visible navigation entries.
pub async fn list_navigation(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<Vec<NavigationItem>> {
    require_site(&state.repo, &site_id).await?;
    success(state.repo.list_navigation(&site_id).await?)
}

/// POST /api/sites/:id/navigation - Create a navigation entry.
pub async fn create_navigation_item(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Json(request): Json<CreateNavigationItemRequest>,
) -> ApiResult<NavigationItem> {
    request.validate().map_err(AppError::Validation)?;

    require_site(&state.repo, &site_id).await?;
    success(state.repo.create_navigation_item(&site_id, &request).await?)
}

/// GET /api/sites/:id/templates - List templates.
pub async fn list_templates(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<Vec<Template>> {
    require_site(&state.repo, &site_id).await?;
    success(state.repo.list_templates(&site_id).await?)
}

/// POST /api/sites/:id/templates - Create a user template.
pub async fn create_template(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Json(mut request): Json<CreateTemplateRequest>,
) -> ApiResult<Template> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    // Built-ins are only installed by the system
    request.is_built_in = false;

    require_site(&state.repo, &site_id).await?;
    success(state.repo.create_template(&site_id, &request).await?)
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
