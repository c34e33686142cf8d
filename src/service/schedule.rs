//! Availability polling: date options, per-member availability, final date.

use super::{authorize, require_meet};
use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    AddDateOptionRequest, DateOption, MeetPhase, SelectDateResponse, SubmitAvailabilityRequest,
};

/// Propose a meeting time. Draft phase only, host/admin only.
pub async fn add_date_option(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    request: &AddDateOptionRequest,
) -> Result<DateOption, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Draft {
        return Err(AppError::InvalidPhase(
            "Date options can only be added during the draft phase".to_string(),
        ));
    }
    authorize(actor, &meet, "add date options")?;

    if request.date_time.trim().is_empty() {
        return Err(AppError::Validation("dateTime is required".to_string()));
    }

    repo.insert_date_option(meet_id, &request.date_time).await
}

/// Withdraw a proposed meeting time. Draft phase only, host/admin only. A
/// previously selected date survives as a snapshot.
pub async fn remove_date_option(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    option_id: &str,
) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Draft {
        return Err(AppError::InvalidPhase(
            "Date options can only be removed during the draft phase".to_string(),
        ));
    }
    authorize(actor, &meet, "remove date options")?;

    let option = repo
        .get_date_option(option_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Date option {} not found", option_id)))?;
    if option.meet_id != meet_id {
        return Err(AppError::NotFound(format!(
            "Date option {} not found in this meet",
            option_id
        )));
    }

    repo.delete_date_option(option_id).await
}

/// Submit a member's availability for the meet's date options. Voting phase
/// only. Upsert per (option, member); no budget applies.
pub async fn submit_availability(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    request: &SubmitAvailabilityRequest,
) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Voting {
        return Err(AppError::InvalidPhase(
            "Availability voting is only allowed during the voting phase".to_string(),
        ));
    }

    for vote in &request.votes {
        let option = repo
            .get_date_option(&vote.date_option_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Date option {} not found", vote.date_option_id))
            })?;
        if option.meet_id != meet_id {
            return Err(AppError::NotFound(format!(
                "Date option {} not found in this meet",
                vote.date_option_id
            )));
        }
    }

    repo.upsert_date_votes(&actor.id, &request.votes).await
}

/// Pick the final date. Host/admin only, draft or voting phase. The option's
/// datetime is copied into the meet; deleting the option later does not
/// unset it.
pub async fn select_date(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    date_option_id: &str,
) -> Result<SelectDateResponse, AppError> {
    let meet = require_meet(repo, meet_id).await?;
    authorize(actor, &meet, "select a date")?;

    if meet.phase != MeetPhase::Draft && meet.phase != MeetPhase::Voting {
        return Err(AppError::InvalidPhase(
            "A date can only be selected during the draft or voting phase".to_string(),
        ));
    }

    let option = repo
        .get_date_option(date_option_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Date option {} not found", date_option_id)))?;
    if option.meet_id != meet_id {
        return Err(AppError::NotFound(format!(
            "Date option {} not found in this meet",
            date_option_id
        )));
    }

    repo.set_selected_date(meet_id, &option.date_time).await?;

    Ok(SelectDateResponse {
        selected_date: option.date_time,
    })
}
