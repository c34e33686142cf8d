//! Top 5 ranking endpoints: per-meet submissions and the club leaderboard.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::models::{AggregatedRanking, SubmitTop5Request, Top5Entry};
use crate::service;
use crate::AppState;

/// GET /api/meets/{id}/top5 - All members' Top 5 entries for a meet.
pub async fn list_top5(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<Vec<Top5Entry>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = service::require_meet(&state.repo, &id).await {
        return error(e, revision_id);
    }
    match state.repo.list_top5(&id).await {
        Ok(entries) => success(entries, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/meets/{id}/top5 - Replace the caller's Top 5 for a meet.
pub async fn submit_top5(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SubmitTop5Request>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::top5::submit_top5(&state.repo, &actor, &id, &request).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/rankings - Cross-meet aggregated leaderboard.
pub async fn aggregate_ranking(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<Vec<AggregatedRanking>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::top5::aggregate_ranking(&state.repo).await {
        Ok(ranking) => success(ranking, revision_id),
        Err(e) => error(e, revision_id),
    }
}
