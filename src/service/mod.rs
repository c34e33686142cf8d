//! Core decision logic: candidate management, point voting, phase
//! transitions, availability polling, Top 5 aggregation, book catalogue
//! rules.
//!
//! All validation happens before any mutation; the repository's
//! transactional operations keep multi-row mutations all-or-nothing.

pub mod books;
pub mod candidates;
pub mod phase;
pub mod schedule;
pub mod top5;
pub mod voting;

use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Meet;

/// Host-or-admin capability check, shared by every privileged operation.
pub fn authorize(actor: &Actor, meet: &Meet, action: &str) -> Result<(), AppError> {
    if meet.host_id == actor.id || actor.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the host or an admin can {}",
            action
        )))
    }
}

/// Fetch a meet or fail with NotFound.
pub async fn require_meet(repo: &Repository, meet_id: &str) -> Result<Meet, AppError> {
    repo.get_meet(meet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meet {} not found", meet_id)))
}
