use chrono::{DateTime, Utc};

use crate::models::{RabData, RabStatus, ReviewRabInput, Role, SessionContext};

use super::WorkflowError;

pub fn can_edit_rab(ctx: &SessionContext, rab: &RabData) -> bool {
    match ctx.role {
        Role::Admin => true,
        Role::Principal => rab.user_id == ctx.user_id && rab.status.is_editable(),
        Role::Foundation => false,
    }
}

/// A principal may delete only while the plan is still theirs to edit;
/// admin may delete from any status.
pub fn can_delete_rab(ctx: &SessionContext, rab: &RabData) -> bool {
    match ctx.role {
        Role::Admin => true,
        Role::Principal => rab.user_id == ctx.user_id && rab.status.is_editable(),
        Role::Foundation => false,
    }
}

/// Draft -> Submitted. A rejected plan resubmits through the same gate.
pub fn submit_rab(
    ctx: &SessionContext,
    rab: &mut RabData,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if !can_edit_rab(ctx, rab) {
        return Err(WorkflowError::Forbidden);
    }
    if !rab.status.is_editable() {
        return Err(WorkflowError::InvalidTransition {
            entity: "budget plan",
            action: "submit",
            status: rab.status.as_str(),
        });
    }
    if rab.routine_expenses.is_empty() && rab.incidental_expenses.is_empty() {
        return Err(WorkflowError::validation("must have at least one expense item"));
    }

    rab.status = RabStatus::Submitted;
    rab.submitted_at = Some(now);
    Ok(())
}

pub fn approve_rab(
    ctx: &SessionContext,
    rab: &mut RabData,
    input: ReviewRabInput,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    review_rab(ctx, rab, input, now, RabStatus::Approved, "approve")
}

pub fn reject_rab(
    ctx: &SessionContext,
    rab: &mut RabData,
    input: ReviewRabInput,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    review_rab(ctx, rab, input, now, RabStatus::Rejected, "reject")
}

fn review_rab(
    ctx: &SessionContext,
    rab: &mut RabData,
    input: ReviewRabInput,
    now: DateTime<Utc>,
    verdict: RabStatus,
    action: &'static str,
) -> Result<(), WorkflowError> {
    if !matches!(ctx.role, Role::Foundation | Role::Admin) {
        return Err(WorkflowError::Forbidden);
    }
    if rab.status != RabStatus::Submitted {
        return Err(WorkflowError::InvalidTransition {
            entity: "budget plan",
            action,
            status: rab.status.as_str(),
        });
    }

    rab.status = verdict;
    rab.reviewed_at = Some(now);
    rab.review_comment = input.review_comment;
    Ok(())
}
