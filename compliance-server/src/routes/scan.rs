use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use compliance_core::{ScanRequest, ScanResult};

use super::AppState;
use crate::error::AppError;

/// `POST /api/v1/scan/` — the only scan entry point this crate implements;
/// PR/commit-diff scanning (below) are named but out of core scope.
///
/// The body is read as raw bytes and deserialized by hand rather than via
/// axum's `Json<ScanRequest>` extractor: that extractor's own deserialize
/// failures surface as `422 Unprocessable Entity`, but spec §7 requires a
/// malformed `ScanRequest` to surface as `400` with an `{detail}` body, so
/// the failure needs to route through `AppError::Validation` instead.
pub async fn scan(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ScanResult>, AppError> {
    let mut request: ScanRequest = serde_json::from_slice(&body)?;
    request.repository = super::normalize_repository(&request.repository);
    let result = state.orchestrator.scan(request).await?;
    Ok(Json(result))
}

pub async fn scan_pr_not_implemented(
    Path((_owner, _repo, _pr)): Path<(String, String, u64)>,
) -> AppError {
    AppError::NotImplemented
}

pub async fn scan_commit_not_implemented(
    Path((_owner, _repo, _sha)): Path<(String, String, String)>,
) -> AppError {
    AppError::NotImplemented
}
