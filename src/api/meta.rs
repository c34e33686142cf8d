//! Revision and club config endpoints.

use axum::extract::State;

use super::{error, success, ApiResult};
use crate::models::{ClubConfig, RevisionInfo};
use crate::service::voting::VOTING_POINTS_TOTAL;
use crate::AppState;

/// GET /api/revision - Current datastore revision for poll/refetch clients.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    match state.repo.get_revision_info().await {
        Ok(info) => {
            let revision_id = info.revision_id;
            success(info, revision_id)
        }
        Err(e) => error(e, 0),
    }
}

/// GET /api/config - Fixed club constants.
pub async fn get_config(State(state): State<AppState>) -> ApiResult<ClubConfig> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    success(
        ClubConfig {
            voting_points_total: VOTING_POINTS_TOTAL,
        },
        revision_id,
    )
}
