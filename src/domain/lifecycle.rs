use chrono::NaiveDateTime;

use crate::domain::role::{Action, Role};
use crate::domain::status::Status;
use crate::error::{AppError, AppResult};
use crate::models::Complaint;

/// Field updates produced by a status transition. Written in a single
/// UPDATE so the status and its timestamps never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: Status,
    pub resolved_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

/// Validates a requested status change and computes the timestamps that
/// travel with it. The role gate runs before the target value is parsed.
///
/// `resolved_at` is stamped the first time a complaint reaches RESOLVED
/// and kept on every later transition, including re-resolves. `closed_at`
/// is stamped on every entry into CLOSED.
pub fn plan_transition(
    actor: Role,
    complaint: &Complaint,
    target: &str,
    now: NaiveDateTime,
) -> AppResult<TransitionPlan> {
    actor.require(Action::TransitionComplaint)?;

    let status = Status::parse(target)
        .ok_or_else(|| AppError::bad_request(format!("unknown status: {target}")))?;

    let resolved_at = match status {
        Status::Resolved => complaint.resolved_at.or(Some(now)),
        _ => complaint.resolved_at,
    };
    let closed_at = match status {
        Status::Closed => Some(now),
        _ => complaint.closed_at,
    };

    Ok(TransitionPlan {
        status,
        resolved_at,
        closed_at,
        updated_at: now,
    })
}
