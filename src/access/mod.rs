//! Role-based view routing.
//!
//! The presentation layer asks two questions: which views does this role
//! get at all, and may this role mutate from this view given the entity's
//! edit gate. Each view carries its own explicit allow-lists; there is no
//! inheritance between roles.

use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    Dashboard,
    Reports,
    ReportReview,
    RabEditor,
    RabReview,
    Realizations,
    Memos,
    MemoInbox,
    UserManagement,
}

impl ViewId {
    pub const ALL: [ViewId; 9] = [
        Self::Dashboard,
        Self::Reports,
        Self::ReportReview,
        Self::RabEditor,
        Self::RabReview,
        Self::Realizations,
        Self::Memos,
        Self::MemoInbox,
        Self::UserManagement,
    ];

    fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::Dashboard => &[Role::Principal, Role::Foundation, Role::Admin],
            Self::Reports => &[Role::Principal, Role::Admin],
            Self::ReportReview => &[Role::Foundation, Role::Admin],
            Self::RabEditor => &[Role::Principal, Role::Admin],
            Self::RabReview => &[Role::Foundation, Role::Admin],
            Self::Realizations => &[Role::Principal, Role::Foundation, Role::Admin],
            Self::Memos => &[Role::Principal, Role::Admin],
            Self::MemoInbox => &[Role::Foundation, Role::Admin],
            Self::UserManagement => &[Role::Admin],
        }
    }

    /// Roles that may issue writes from this view. Review views mutate
    /// (approve/reject are writes), inbox views do not.
    fn mutating_roles(&self) -> &'static [Role] {
        match self {
            Self::Dashboard => &[],
            Self::Reports => &[Role::Principal, Role::Admin],
            Self::ReportReview => &[Role::Foundation, Role::Admin],
            Self::RabEditor => &[Role::Principal, Role::Admin],
            Self::RabReview => &[Role::Foundation, Role::Admin],
            Self::Realizations => &[Role::Principal, Role::Foundation, Role::Admin],
            Self::Memos => &[Role::Principal, Role::Admin],
            Self::MemoInbox => &[],
            Self::UserManagement => &[Role::Admin],
        }
    }
}

/// Whether the entity behind a view is currently open for editing; computed
/// by the caller from the entity's status (e.g. a RAB is open while draft or
/// rejected). Admin ignores the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditGate {
    Open,
    Locked,
}

pub fn visible_views(role: Role) -> Vec<ViewId> {
    ViewId::ALL
        .into_iter()
        .filter(|view| view.allowed_roles().contains(&role))
        .collect()
}

pub fn can_mutate(role: Role, view: ViewId, gate: EditGate) -> bool {
    if !view.mutating_roles().contains(&role) {
        return false;
    }
    role == Role::Admin || gate == EditGate::Open
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_every_view() {
        assert_eq!(visible_views(Role::Admin).len(), ViewId::ALL.len());
    }

    #[test]
    fn principal_never_sees_review_views() {
        let views = visible_views(Role::Principal);
        assert!(!views.contains(&ViewId::ReportReview));
        assert!(!views.contains(&ViewId::RabReview));
        assert!(!views.contains(&ViewId::UserManagement));
        assert!(views.contains(&ViewId::Reports));
    }

    #[test]
    fn locked_entities_block_everyone_but_admin() {
        assert!(!can_mutate(Role::Principal, ViewId::RabEditor, EditGate::Locked));
        assert!(can_mutate(Role::Principal, ViewId::RabEditor, EditGate::Open));
        assert!(can_mutate(Role::Admin, ViewId::RabEditor, EditGate::Locked));
    }

    #[test]
    fn foundation_cannot_mutate_from_the_memo_inbox() {
        assert!(!can_mutate(Role::Foundation, ViewId::MemoInbox, EditGate::Open));
    }
}
