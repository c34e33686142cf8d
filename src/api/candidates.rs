//! Candidate nomination and book selection endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::models::{AddCandidateRequest, Candidate, SelectBookRequest, SelectBookResponse};
use crate::service;
use crate::AppState;

/// POST /api/meets/{id}/candidates - Nominate a book (draft phase only).
pub async fn add_candidate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<AddCandidateRequest>,
) -> ApiResult<Candidate> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::candidates::add_candidate(&state.repo, &actor, &id, &request).await {
        Ok(candidate) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(candidate, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/meets/{id}/candidates/{candidateId} - Withdraw a nomination.
pub async fn remove_candidate(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, candidate_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::candidates::remove_candidate(&state.repo, &actor, &id, &candidate_id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets/{id}/select-book - Select the meet's book.
pub async fn select_book(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SelectBookRequest>,
) -> ApiResult<SelectBookResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::candidates::select_book(&state.repo, &actor, &id, &request.book_id).await {
        Ok(response) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(response, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets/{id}/resolve-tie - Pick any candidate regardless of score.
pub async fn resolve_tie(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<SelectBookRequest>,
) -> ApiResult<SelectBookResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::candidates::resolve_tie(&state.repo, &actor, &id, &request.book_id).await {
        Ok(response) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(response, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
