use crate::models::{RabData, RabRealization, RabStatus, RealizationStatus, Role, SessionContext};

use super::WorkflowError;

/// A realization can only originate from an approved plan owned by the
/// actor (or anyone's plan, for admin).
pub fn ensure_realization_creatable(
    ctx: &SessionContext,
    rab: &RabData,
) -> Result<(), WorkflowError> {
    match ctx.role {
        Role::Admin => {}
        Role::Principal if rab.user_id == ctx.user_id => {}
        _ => return Err(WorkflowError::Forbidden),
    }
    if rab.status != RabStatus::Approved {
        return Err(WorkflowError::validation(
            "realizations can only be created from an approved budget plan",
        ));
    }
    Ok(())
}

/// Item edits are only legal while the realization is in progress.
pub fn ensure_realization_items_editable(
    ctx: &SessionContext,
    realization: &RabRealization,
) -> Result<(), WorkflowError> {
    match ctx.role {
        Role::Admin => {}
        Role::Principal if realization.user_id == ctx.user_id => {}
        _ => return Err(WorkflowError::Forbidden),
    }
    if realization.status != RealizationStatus::InProgress {
        return Err(WorkflowError::InvalidTransition {
            entity: "realization",
            action: "edit",
            status: realization.status.as_str(),
        });
    }
    Ok(())
}

/// InProgress -> Submitted, by the owning principal or admin.
pub fn submit_realization(
    ctx: &SessionContext,
    realization: &mut RabRealization,
) -> Result<(), WorkflowError> {
    match ctx.role {
        Role::Admin => {}
        Role::Principal if realization.user_id == ctx.user_id => {}
        _ => return Err(WorkflowError::Forbidden),
    }
    if realization.status != RealizationStatus::InProgress {
        return Err(WorkflowError::InvalidTransition {
            entity: "realization",
            action: "submit",
            status: realization.status.as_str(),
        });
    }
    realization.status = RealizationStatus::Submitted;
    Ok(())
}

/// Submitted -> Approved, by foundation or admin.
pub fn approve_realization(
    ctx: &SessionContext,
    realization: &mut RabRealization,
) -> Result<(), WorkflowError> {
    if !matches!(ctx.role, Role::Foundation | Role::Admin) {
        return Err(WorkflowError::Forbidden);
    }
    if realization.status != RealizationStatus::Submitted {
        return Err(WorkflowError::InvalidTransition {
            entity: "realization",
            action: "approve",
            status: realization.status.as_str(),
        });
    }
    realization.status = RealizationStatus::Approved;
    Ok(())
}

/// Approved -> Completed, by foundation or admin.
pub fn complete_realization(
    ctx: &SessionContext,
    realization: &mut RabRealization,
) -> Result<(), WorkflowError> {
    if !matches!(ctx.role, Role::Foundation | Role::Admin) {
        return Err(WorkflowError::Forbidden);
    }
    if realization.status != RealizationStatus::Approved {
        return Err(WorkflowError::InvalidTransition {
            entity: "realization",
            action: "complete",
            status: realization.status.as_str(),
        });
    }
    realization.status = RealizationStatus::Completed;
    Ok(())
}
