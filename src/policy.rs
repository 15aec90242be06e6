//! Project-scoped authorization decisions.
//!
//! [`authorize`] is a pure function: callers load the facts it needs (the
//! caller's membership row, the issue reporter, whether a key is taken) in
//! the same request and pass them in. Nothing here touches the database, so
//! no role facts outlive a request.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. Membership gate: every project-scoped action requires a membership row.
//! 2. Maintainer gate: project settings and membership changes.
//! 3. Ownership: issue updates need the maintainer role or authorship.
//! 4. Conflicts: duplicate memberships and project keys.
//!
//! The caller's [`GlobalRole`](crate::model::GlobalRole) is never consulted.

use std::fmt;

use crate::auth::Principal;
use crate::model::ProjectMember;
use crate::types::UserId;

/// Something a principal wants to do. Variants carry the extra facts the
/// corresponding rule needs.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Create a project. No membership exists yet.
    CreateProject { key_in_use: bool },
    ReadProject,
    /// Change name, key or description. `key_in_use` is true when a new key
    /// was requested and another project already holds it.
    UpdateProject { key_in_use: bool },
    ListMembers,
    /// Enroll a user. `target_membership` is that user's existing row, if any.
    AddMember {
        target_membership: Option<&'a ProjectMember>,
    },
    ReadIssues,
    CreateIssue,
    ReadIssue,
    UpdateIssue { reporter_id: &'a UserId },
    ReadComments,
    CreateComment,
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateProject { .. } => "create_project",
            Self::ReadProject => "read_project",
            Self::UpdateProject { .. } => "update_project",
            Self::ListMembers => "list_members",
            Self::AddMember { .. } => "add_member",
            Self::ReadIssues => "read_issues",
            Self::CreateIssue => "create_issue",
            Self::ReadIssue => "read_issue",
            Self::UpdateIssue { .. } => "update_issue",
            Self::ReadComments => "read_comments",
            Self::CreateComment => "create_comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    NotAMember,
    MaintainerRequired,
    NotOwnerOrMaintainer,
}

impl ForbiddenReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAMember => "not_a_member",
            Self::MaintainerRequired => "maintainer_required",
            Self::NotOwnerOrMaintainer => "not_owner_or_maintainer",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAMember => write!(f, "Not enough permissions"),
            Self::MaintainerRequired => write!(f, "Only project maintainers can do this"),
            Self::NotOwnerOrMaintainer => write!(
                f,
                "You can only update issues you reported unless you are a project maintainer"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    DuplicateEmail,
    DuplicateKey,
    AlreadyMember,
}

impl ConflictReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateEmail => "duplicate_email",
            Self::DuplicateKey => "duplicate_key",
            Self::AlreadyMember => "already_member",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEmail => write!(f, "A user with this email already exists"),
            Self::DuplicateKey => write!(f, "A project with this key already exists"),
            Self::AlreadyMember => write!(f, "User is already a member"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbidden(ForbiddenReason),
    Conflict(ConflictReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `principal` may perform `action`.
///
/// `membership` is the principal's own membership row for the project the
/// action targets (`None` when they have none). It is ignored for
/// [`Action::CreateProject`].
pub fn authorize(
    principal: &Principal,
    membership: Option<&ProjectMember>,
    action: Action<'_>,
) -> Decision {
    if let Action::CreateProject { key_in_use } = action {
        return create_project(key_in_use);
    }

    let Some(member) = membership.filter(|m| &m.user_id == principal.user_id()) else {
        return Decision::Forbidden(ForbiddenReason::NotAMember);
    };

    match action {
        Action::CreateProject { key_in_use } => create_project(key_in_use),
        Action::ReadProject
        | Action::ListMembers
        | Action::ReadIssues
        | Action::CreateIssue
        | Action::ReadIssue
        | Action::ReadComments
        | Action::CreateComment => Decision::Allow,
        Action::UpdateProject { key_in_use } => {
            if !member.is_maintainer() {
                Decision::Forbidden(ForbiddenReason::MaintainerRequired)
            } else if key_in_use {
                Decision::Conflict(ConflictReason::DuplicateKey)
            } else {
                Decision::Allow
            }
        }
        Action::AddMember { target_membership } => {
            if !member.is_maintainer() {
                Decision::Forbidden(ForbiddenReason::MaintainerRequired)
            } else if target_membership.is_some() {
                Decision::Conflict(ConflictReason::AlreadyMember)
            } else {
                Decision::Allow
            }
        }
        Action::UpdateIssue { reporter_id } => {
            if member.is_maintainer() || reporter_id == principal.user_id() {
                Decision::Allow
            } else {
                Decision::Forbidden(ForbiddenReason::NotOwnerOrMaintainer)
            }
        }
    }
}

fn create_project(key_in_use: bool) -> Decision {
    if key_in_use {
        Decision::Conflict(ConflictReason::DuplicateKey)
    } else {
        Decision::Allow
    }
}
