//! The meet phase state machine.

use super::{authorize, require_meet};
use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::MeetPhase;

/// Transition a meet to a new phase.
///
/// The transition must be in the legal set for the current phase. Moving to
/// `reading` additionally requires a selected book and date, checked against
/// freshly re-read meet state so a racing selection is picked up.
pub async fn change_phase(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    target: MeetPhase,
) -> Result<MeetPhase, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "change the phase")?;

    if !meet.phase.can_transition_to(target) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot transition from {} to {}",
            meet.phase.as_str(),
            target.as_str()
        )));
    }

    if target == MeetPhase::Reading {
        let current = require_meet(repo, meet_id).await?;
        if current.selected_book_id.is_none() {
            return Err(AppError::PreconditionFailed(
                "A book must be selected before moving to the reading phase".to_string(),
            ));
        }
        if current.selected_date.is_none() {
            return Err(AppError::PreconditionFailed(
                "A date must be selected before moving to the reading phase".to_string(),
            ));
        }
    }

    repo.set_meet_phase(meet_id, target).await?;
    Ok(target)
}

/// Delete a meet. Host/admin only, allowed in any phase; candidates, votes,
/// date data and Top 5 entries go with it.
pub async fn delete_meet(repo: &Repository, actor: &Actor, meet_id: &str) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "delete this meet")?;

    repo.delete_meet(&meet.id).await
}
