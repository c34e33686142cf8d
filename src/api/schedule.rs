//! Date polling endpoints: options, availability, date selection.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::models::{
    AddDateOptionRequest, DateOption, SelectDateRequest, SelectDateResponse,
    SubmitAvailabilityRequest,
};
use crate::service;
use crate::AppState;

/// POST /api/meets/{id}/date-options - Propose a meeting time (draft phase).
pub async fn add_date_option(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<AddDateOptionRequest>,
) -> ApiResult<DateOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::schedule::add_date_option(&state.repo, &actor, &id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/meets/{id}/date-options/{optionId} - Withdraw a proposed time.
pub async fn remove_date_option(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, option_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::schedule::remove_date_option(&state.repo, &actor, &id, &option_id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/meets/{id}/availability - Record the caller's availability votes.
pub async fn submit_availability(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SubmitAvailabilityRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::schedule::submit_availability(&state.repo, &actor, &id, &request).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets/{id}/select-date - Snapshot a proposed time as the meet date.
pub async fn select_date(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SelectDateRequest>,
) -> ApiResult<SelectDateResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::schedule::select_date(&state.repo, &actor, &id, &request.date_option_id).await {
        Ok(response) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(response, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
