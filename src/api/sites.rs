//! Site registration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_site, success, ApiResult};
use crate::errors::AppError;
use crate::models::{NewSite, Site};
use crate::site::install_starter_templates;
use crate::AppState;

/// POST /api/sites - Register a new site.
pub async fn create_site(
    State(state): State<AppState>,
    Json(request): Json<NewSite>,
) -> ApiResult<Site> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if request.domain.trim().is_empty() {
        return Err(AppError::Validation("Domain is required".to_string()));
    }
    if request.owner_email.trim().is_empty() {
        return Err(AppError::Validation("Owner email is required".to_string()));
    }

    let site = state.repo.create_site(&request).await?;
    let templates = install_starter_templates(&state.repo, &site.id).await;
    tracing::info!(
        "Registered site {} for {} with {} starter templates",
        site.id,
        site.domain,
        templates
    );

    success(site)
}

/// GET /api/sites/:id - Get a single site.
pub async fn get_site(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Site> {
    success(require_site(&state.repo, &id).await?)
}
