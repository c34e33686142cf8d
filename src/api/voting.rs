//! Point-vote endpoints: submission, reveal, per-member status.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::models::{SubmitVotesRequest, VoteStatus};
use crate::service;
use crate::AppState;

/// PUT /api/meets/{id}/votes - Submit or replace the caller's allocation.
pub async fn submit_votes(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SubmitVotesRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::voting::submit_votes(&state.repo, &actor, &id, &request).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets/{id}/reveal - Reveal point totals (host or admin, idempotent).
pub async fn reveal_scores(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::voting::reveal_scores(&state.repo, &actor, &id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/meets/{id}/vote-status - Has-voted flags for the permanent roster.
pub async fn vote_status(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<Vec<VoteStatus>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let roster = match state.repo.list_permanent_members().await {
        Ok(roster) => roster,
        Err(e) => return error(e, revision_id),
    };
    match service::voting::vote_status(&state.repo, &roster, &id).await {
        Ok(status) => success(status, revision_id),
        Err(e) => error(e, revision_id),
    }
}
