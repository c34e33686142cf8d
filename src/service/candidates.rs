//! Candidate nominations and the book selection policy.

use super::{authorize, require_meet};
use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{AddCandidateRequest, Candidate, MeetPhase, SelectBookResponse};

/// Nominate a book for a meet. Draft phase only, host/admin only.
pub async fn add_candidate(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    request: &AddCandidateRequest,
) -> Result<Candidate, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Draft {
        return Err(AppError::InvalidPhase(
            "Candidates can only be added during the draft phase".to_string(),
        ));
    }
    authorize(actor, &meet, "add candidates")?;

    let book = repo
        .get_book(&request.book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", request.book_id)))?;

    let id = repo
        .insert_candidate(
            meet_id,
            &request.book_id,
            request.motivation.as_deref(),
            &actor.id,
        )
        .await?;

    let already_selected = repo.book_selected_in_completed_meet(&request.book_id).await?;

    Ok(Candidate {
        id,
        meet_id: meet_id.to_string(),
        book_id: request.book_id.clone(),
        book_title: book.title,
        book_author: book.author,
        motivation: request.motivation.clone(),
        added_by: actor.id.clone(),
        added_by_username: actor.username.clone(),
        already_selected_in_meet: already_selected,
        points: None,
    })
}

/// Withdraw a nomination. Draft phase only, host/admin only. The delete is
/// unconditional, a currently selected candidate included.
pub async fn remove_candidate(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    candidate_id: &str,
) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Draft {
        return Err(AppError::InvalidPhase(
            "Candidates can only be removed during the draft phase".to_string(),
        ));
    }
    authorize(actor, &meet, "remove candidates")?;

    repo.get_candidate(meet_id, candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {} not found", candidate_id)))?;

    repo.delete_candidate(candidate_id).await
}

/// Select the meet's book.
///
/// Draft: permitted only when there is exactly one candidate and it matches
/// the requested book. Voting: permitted only after reveal, and only for a
/// candidate whose total equals the maximum; ties are broken by the actor's
/// choice. Any other phase is rejected outright.
pub async fn select_book(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    book_id: &str,
) -> Result<SelectBookResponse, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "select a book")?;

    let candidates = repo.list_candidates(meet_id).await?;

    match meet.phase {
        MeetPhase::Draft => {
            if candidates.len() != 1 {
                return Err(AppError::InvalidSelection(
                    "Direct selection requires exactly one candidate. Start the voting phase instead."
                        .to_string(),
                ));
            }
            if candidates[0].book_id != book_id {
                return Err(AppError::InvalidSelection(
                    "Can only select the sole candidate book".to_string(),
                ));
            }
        }
        MeetPhase::Voting => {
            if !meet.voting_points_revealed {
                return Err(AppError::InvalidState(
                    "Scores must be revealed before selecting a book".to_string(),
                ));
            }

            let totals = repo.candidate_point_totals(meet_id).await?;
            // Candidates without vote rows count as 0, not as absent.
            let scored: Vec<(&str, i64)> = candidates
                .iter()
                .map(|c| {
                    (
                        c.book_id.as_str(),
                        totals.get(&c.id).copied().unwrap_or(0),
                    )
                })
                .collect();

            let max_points = scored.iter().map(|(_, p)| *p).max();
            let is_top = max_points.is_some_and(|max| {
                scored
                    .iter()
                    .any(|(b, p)| *b == book_id && *p == max)
            });
            if !is_top {
                return Err(AppError::InvalidSelection(
                    "Can only select a book that has the highest number of votes".to_string(),
                ));
            }
        }
        _ => {
            return Err(AppError::InvalidPhase(
                "Cannot select a book in this phase".to_string(),
            ));
        }
    }

    repo.set_selected_book(meet_id, book_id).await?;

    let already_selected = repo.book_selected_in_completed_meet(book_id).await?;
    Ok(SelectBookResponse {
        selected_book_id: book_id.to_string(),
        already_selected_in_meet: already_selected,
    })
}

/// Manual escape hatch: force the selected book regardless of phase or
/// candidate membership. Host/admin only.
pub async fn resolve_tie(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    book_id: &str,
) -> Result<SelectBookResponse, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "resolve a tie")?;

    repo.set_selected_book(meet_id, book_id).await?;

    let already_selected = repo.book_selected_in_completed_meet(book_id).await?;
    Ok(SelectBookResponse {
        selected_book_id: book_id.to_string(),
        already_selected_in_meet: already_selected,
    })
}
