//! Snapshot generation and retrieval endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::Value;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::snapshot::{Collection, SnapshotReport};
use crate::AppState;

/// Request body for regenerating snapshots.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSnapshotsRequest {
    /// Site to generate for; resolved (and possibly created) when absent
    #[serde(default)]
    pub site_id: Option<String>,
}

impl GenerateSnapshotsRequest {
    /// Parse a request body. An empty body is the same as `{}`, so deploy hooks
    /// can trigger a run without sending JSON.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
    }
}

/// POST /api/snapshots - Regenerate all snapshot files.
pub async fn generate_snapshots(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<SnapshotReport> {
    let request = GenerateSnapshotsRequest::from_body(&body)?;
    let report = state
        .generator
        .generate_all(request.site_id.as_deref())
        .await?;
    success(report)
}

/// GET /api/snapshots/:collection - Current contents of one snapshot file.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> ApiResult<Value> {
    let collection = Collection::parse(&collection)
        .ok_or_else(|| AppError::NotFound(format!("Unknown snapshot {}", collection)))?;
    success(state.reader.read_value(collection).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_parsing() {
        assert!(GenerateSnapshotsRequest::from_body(b"")
            .unwrap()
            .site_id
            .is_none());
        assert!(GenerateSnapshotsRequest::from_body(b" \n").is_ok());
        assert_eq!(
            GenerateSnapshotsRequest::from_body(br#"{"siteId":"site-a"}"#)
                .unwrap()
                .site_id
                .as_deref(),
            Some("site-a")
        );
        assert!(matches!(
            GenerateSnapshotsRequest::from_body(b"site-a"),
            Err(AppError::BadRequest(_))
        ));
    }
}
