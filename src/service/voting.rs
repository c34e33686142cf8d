//! The point voting engine: fixed-budget allocations, reveal semantics, and
//! vote status against the roster.

use std::collections::HashSet;

use super::{authorize, require_meet};
use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Member, MeetPhase, SubmitVotesRequest, VoteAllocation, VoteStatus};

/// Fixed point budget each member distributes across candidates per meet.
pub const VOTING_POINTS_TOTAL: i64 = 15;

/// Validate a vote submission against the fixed budget: non-negative points,
/// no duplicate candidates, sum exactly equal to the budget.
fn validate_allocation(votes: &[VoteAllocation]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for vote in votes {
        if vote.points < 0 {
            return Err(AppError::Validation(
                "Vote points must be non-negative".to_string(),
            ));
        }
        if !seen.insert(vote.candidate_id.as_str()) {
            return Err(AppError::Validation(format!(
                "Candidate {} appears more than once in the submission",
                vote.candidate_id
            )));
        }
    }

    let total: i64 = votes.iter().map(|v| v.points).sum();
    if total != VOTING_POINTS_TOTAL {
        return Err(AppError::InvalidAllocation(format!(
            "You must distribute exactly {} points (you distributed {})",
            VOTING_POINTS_TOTAL, total
        )));
    }
    Ok(())
}

/// Submit a member's complete vote set for a meet. Voting phase only. Prior
/// votes are replaced atomically; zero-point rows are not persisted.
pub async fn submit_votes(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    request: &SubmitVotesRequest,
) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Voting {
        return Err(AppError::InvalidPhase(
            "Voting is only allowed during the voting phase".to_string(),
        ));
    }

    validate_allocation(&request.votes)?;

    let candidates = repo.list_candidates(meet_id).await?;
    let candidate_ids: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    for vote in &request.votes {
        if !candidate_ids.contains(vote.candidate_id.as_str()) {
            return Err(AppError::NotFound(format!(
                "Candidate {} not found in this meet",
                vote.candidate_id
            )));
        }
    }

    repo.replace_candidate_votes(meet_id, &actor.id, &request.votes)
        .await
}

/// Expose aggregate point totals to all members. Host/admin only. Calling
/// again on an already revealed meet is a no-op.
pub async fn reveal_scores(repo: &Repository, actor: &Actor, meet_id: &str) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "reveal scores")?;

    repo.set_points_revealed(meet_id).await
}

/// Per-roster-member has-voted flags for a meet. The roster is passed in by
/// the caller rather than read from a hidden global.
pub async fn vote_status(
    repo: &Repository,
    roster: &[Member],
    meet_id: &str,
) -> Result<Vec<VoteStatus>, AppError> {
    require_meet(repo, meet_id).await?;
    let voted = repo.voted_member_ids(meet_id).await?;

    Ok(roster
        .iter()
        .map(|m| VoteStatus {
            member_id: m.id.clone(),
            username: m.username.clone(),
            has_voted: voted.contains(&m.id),
        })
        .collect())
}

/// Whether point totals may be shown to members: either explicitly revealed,
/// or the meet has moved on to reading/completed.
pub fn points_visible(meet: &crate::models::Meet) -> bool {
    meet.voting_points_revealed
        || meet.phase == MeetPhase::Reading
        || meet.phase == MeetPhase::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(candidate_id: &str, points: i64) -> VoteAllocation {
        VoteAllocation {
            candidate_id: candidate_id.to_string(),
            points,
        }
    }

    #[test]
    fn test_allocation_exact_budget() {
        assert!(validate_allocation(&[vote("a", 10), vote("b", 5)]).is_ok());
        assert!(validate_allocation(&[vote("a", 15)]).is_ok());
        assert!(validate_allocation(&[vote("a", 15), vote("b", 0)]).is_ok());
    }

    #[test]
    fn test_allocation_wrong_sum() {
        let err = validate_allocation(&[vote("a", 7), vote("b", 5)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidAllocation(_)));
        assert!(err.message().contains("12"));
        assert!(err.message().contains("15"));

        assert!(matches!(
            validate_allocation(&[vote("a", 20)]),
            Err(AppError::InvalidAllocation(_))
        ));
        assert!(matches!(
            validate_allocation(&[]),
            Err(AppError::InvalidAllocation(_))
        ));
    }

    #[test]
    fn test_allocation_negative_points() {
        assert!(matches!(
            validate_allocation(&[vote("a", 20), vote("b", -5)]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_allocation_duplicate_candidate() {
        assert!(matches!(
            validate_allocation(&[vote("a", 10), vote("a", 5)]),
            Err(AppError::Validation(_))
        ));
    }
}
