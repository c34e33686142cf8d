//! Meet lifecycle endpoints: list, detail, info updates, phase transitions.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    ChangePhaseRequest, CreateMeetRequest, Meet, MeetDetail, MeetPhase, PhaseChangedResponse,
    UpdateMeetRequest,
};
use crate::service;
use crate::AppState;

/// GET /api/meets - List all meets.
pub async fn list_meets(State(state): State<AppState>, _actor: Actor) -> ApiResult<Vec<Meet>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_meets().await {
        Ok(meets) => success(meets, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets - Create a draft meet hosted by the caller.
pub async fn create_meet(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateMeetRequest>,
) -> ApiResult<Meet> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .create_meet(&actor.id, &actor.username, &request)
        .await
    {
        Ok(meet) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(meet, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/meets/{id} - Full meet detail.
pub async fn get_meet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<MeetDetail> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match assemble_detail(&state.repo, &actor, &id).await {
        Ok(detail) => success(detail, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/meets/{id} - Update location/description (host or admin).
pub async fn update_meet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateMeetRequest>,
) -> ApiResult<Meet> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let meet = match service::require_meet(&state.repo, &id).await {
        Ok(meet) => meet,
        Err(e) => return error(e, revision_id),
    };
    if let Err(e) = service::authorize(&actor, &meet, "update this meet") {
        return error(e, revision_id);
    }

    match state.repo.update_meet_info(&id, &request).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            match service::require_meet(&state.repo, &id).await {
                Ok(meet) => success(meet, new_revision),
                Err(e) => error(e, new_revision),
            }
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/meets/{id} - Delete a meet and its dependents (host or admin).
pub async fn delete_meet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::phase::delete_meet(&state.repo, &actor, &id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/meets/{id}/phase - Transition the meet to a new phase.
pub async fn change_phase(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<ChangePhaseRequest>,
) -> ApiResult<PhaseChangedResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::phase::change_phase(&state.repo, &actor, &id, request.phase).await {
        Ok(phase) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(PhaseChangedResponse { phase }, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// Assemble the full detail payload for one meet. Candidate point totals are
/// included only once scores are visible to the caller; the caller's own vote
/// rows are always included.
async fn assemble_detail(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
) -> Result<MeetDetail, AppError> {
    let meet = service::require_meet(repo, meet_id).await?;

    let mut candidates = repo.list_candidates(meet_id).await?;
    let mut read_ids = repo.selected_book_ids_in_phase(MeetPhase::Completed).await?;
    // "Already selected" refers to other meets, not this one.
    if meet.phase == MeetPhase::Completed {
        if let Some(own) = &meet.selected_book_id {
            read_ids.remove(own);
        }
    }
    for candidate in &mut candidates {
        candidate.already_selected_in_meet = read_ids.contains(&candidate.book_id);
    }
    if service::voting::points_visible(&meet) {
        let totals = repo.candidate_point_totals(meet_id).await?;
        for candidate in &mut candidates {
            candidate.points = Some(totals.get(&candidate.id).copied().unwrap_or(0));
        }
    }

    let date_options = repo.list_date_options(meet_id).await?;
    let top5_entries = repo.list_top5(meet_id).await?;
    let roster = repo.list_permanent_members().await?;
    let vote_status = service::voting::vote_status(repo, &roster, meet_id).await?;
    let my_votes = repo.my_votes(meet_id, &actor.id).await?;

    Ok(MeetDetail {
        meet,
        candidates,
        date_options,
        top5_entries,
        vote_status,
        my_votes,
    })
}
