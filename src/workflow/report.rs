use chrono::{DateTime, Utc};

use crate::models::{
    ApproveReportInput, EvaluationItem, RejectReportInput, Report, ReportPeriod, ReportStatus,
    Role, SessionContext,
};

use super::WorkflowError;

/// Whether the actor may write report fields at all. A save never changes
/// status, so it is legal in every state for an editor.
pub fn can_edit_report(ctx: &SessionContext, report: &Report) -> bool {
    match ctx.role {
        Role::Admin => true,
        Role::Principal => report.user_id == ctx.user_id,
        Role::Foundation => false,
    }
}

/// Draft -> Submitted. Requires the header fields and at least one activity.
pub fn submit_report(
    ctx: &SessionContext,
    report: &mut Report,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if !can_edit_report(ctx, report) {
        return Err(WorkflowError::Forbidden);
    }
    if report.status != ReportStatus::Draft {
        return Err(WorkflowError::InvalidTransition {
            entity: "report",
            action: "submit",
            status: report.status.as_str(),
        });
    }
    if report.principal_name.trim().is_empty() {
        return Err(WorkflowError::validation("principal name is required"));
    }
    if report.school_name.trim().is_empty() {
        return Err(WorkflowError::validation("school name is required"));
    }
    if report.period == ReportPeriod::Unset {
        return Err(WorkflowError::validation("select a reporting period"));
    }
    if report.activities.is_empty() {
        return Err(WorkflowError::validation("add at least one activity"));
    }

    report.status = ReportStatus::Submitted;
    report.submitted_at = Some(now);
    Ok(())
}

/// Submitted -> Approved. The foundation evaluation must score every item in
/// the catalog.
pub fn approve_report(
    ctx: &SessionContext,
    report: &mut Report,
    input: ApproveReportInput,
) -> Result<(), WorkflowError> {
    if !matches!(ctx.role, Role::Foundation | Role::Admin) {
        return Err(WorkflowError::Forbidden);
    }
    if report.status != ReportStatus::Submitted {
        return Err(WorkflowError::InvalidTransition {
            entity: "report",
            action: "approve",
            status: report.status.as_str(),
        });
    }
    for item in EvaluationItem::ALL {
        if !input.foundation_evaluation.contains_key(&item) {
            return Err(WorkflowError::validation(format!(
                "missing evaluation score for {}",
                item.label()
            )));
        }
    }

    report.status = ReportStatus::Approved;
    report.foundation_evaluation = input.foundation_evaluation;
    report.foundation_comment = input.foundation_comment;
    Ok(())
}

/// Submitted/Approved -> Draft. Clears the foundation evaluation; the
/// comment stays so the principal can read why.
pub fn reject_report(
    ctx: &SessionContext,
    report: &mut Report,
    input: RejectReportInput,
) -> Result<(), WorkflowError> {
    if !matches!(ctx.role, Role::Foundation | Role::Admin) {
        return Err(WorkflowError::Forbidden);
    }
    if !matches!(report.status, ReportStatus::Submitted | ReportStatus::Approved) {
        return Err(WorkflowError::InvalidTransition {
            entity: "report",
            action: "reject",
            status: report.status.as_str(),
        });
    }

    report.status = ReportStatus::Draft;
    report.submitted_at = None;
    report.foundation_evaluation.clear();
    if input.foundation_comment.is_some() {
        report.foundation_comment = input.foundation_comment;
    }
    Ok(())
}
