use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{MemoData, MemoStatus, Role, SessionContext};

use super::WorkflowError;

/// Principals edit their own memos freely until they are sent to the
/// foundation; afterwards the memo is read-only for them.
pub fn can_edit_memo(ctx: &SessionContext, memo: &MemoData) -> bool {
    match ctx.role {
        Role::Admin => true,
        Role::Principal => {
            memo.user_id == ctx.user_id && memo.status != MemoStatus::SentToFoundation
        }
        Role::Foundation => false,
    }
}

/// Draft -> Final.
pub fn finalize_memo(ctx: &SessionContext, memo: &mut MemoData) -> Result<(), WorkflowError> {
    if !can_edit_memo(ctx, memo) {
        return Err(WorkflowError::Forbidden);
    }
    if memo.status != MemoStatus::Draft {
        return Err(WorkflowError::InvalidTransition {
            entity: "memo",
            action: "finalize",
            status: memo.status.as_str(),
        });
    }
    memo.status = MemoStatus::Final;
    Ok(())
}

/// Draft/Final -> SentToFoundation. Terminal for principal editing.
pub fn send_memo_to_foundation(
    ctx: &SessionContext,
    memo: &mut MemoData,
) -> Result<(), WorkflowError> {
    if !can_edit_memo(ctx, memo) {
        return Err(WorkflowError::Forbidden);
    }
    if memo.status == MemoStatus::SentToFoundation {
        return Err(WorkflowError::InvalidTransition {
            entity: "memo",
            action: "send",
            status: memo.status.as_str(),
        });
    }
    memo.status = MemoStatus::SentToFoundation;
    Ok(())
}

/// The one supported "undo": a fresh draft copy of any memo, regardless of
/// its status, fully decoupled from the original. Foundation accounts read
/// memos but never author them, so they cannot duplicate either.
pub fn duplicate_memo(
    ctx: &SessionContext,
    memo: &MemoData,
    today: NaiveDate,
) -> Result<MemoData, WorkflowError> {
    if ctx.role == Role::Foundation {
        return Err(WorkflowError::Forbidden);
    }
    let new_id = Uuid::new_v4();
    let now = chrono::Utc::now();
    Ok(MemoData {
        id: new_id,
        user_id: ctx.user_id,
        memo_number: memo.memo_number.clone(),
        subject: memo.subject.clone(),
        date: today,
        tables: memo
            .tables
            .iter()
            .map(|table| {
                let mut copy = table.clone();
                copy.id = Uuid::new_v4();
                copy.memo_id = new_id;
                copy
            })
            .collect(),
        status: MemoStatus::Draft,
        created_at: now,
        updated_at: now,
    })
}
