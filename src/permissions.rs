//! Which controls a caller is shown.
//!
//! These predicates only decide what the pages render. The backend makes the
//! real decision on every request and its answer always wins.

use crate::models::{Comment, Role, User};

/// Upper bound on admin accounts, mirrored from the backend.
pub const MAX_ADMINS: usize = 3;

/// Id of the main admin, read from configuration. Visible to anyone who can
/// read the deployment config, so it grants nothing by itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainAdminId(Option<String>);

impl MainAdminId {
    pub fn new(id: Option<String>) -> Self {
        Self(id.filter(|s| !s.trim().is_empty()))
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }
}

pub fn is_main_admin(role: Role, id: &str, main_admin: &MainAdminId) -> bool {
    role == Role::Admin && main_admin.as_deref() == Some(id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Promote,
    Demote,
}

impl RoleChange {
    /// The change offered for a user with `current` role.
    pub fn for_role(current: Role) -> Self {
        match current {
            Role::User => RoleChange::Promote,
            Role::Admin => RoleChange::Demote,
        }
    }

    pub fn target_role(&self) -> Role {
        match self {
            RoleChange::Promote => Role::Admin,
            RoleChange::Demote => Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action<'a> {
    ToggleBlock,
    ChangeRole(RoleChange),
    DeleteUser,
    EditPost,
    DeletePost,
    DeleteComment(&'a Comment),
    CreatePost,
    PostComment,
    React,
}

/// Evaluates actions for one caller. `admin_count` is the number of admins in
/// the most recently fetched user list.
#[derive(Debug, Clone, Copy)]
pub struct Gate<'a> {
    caller: Option<&'a User>,
    main_admin: &'a MainAdminId,
    admin_count: usize,
}

impl<'a> Gate<'a> {
    pub fn new(caller: Option<&'a User>, main_admin: &'a MainAdminId) -> Self {
        Self { caller, main_admin, admin_count: 0 }
    }

    pub fn with_admin_count(mut self, admin_count: usize) -> Self {
        self.admin_count = admin_count;
        self
    }

    pub fn caller(&self) -> Option<&'a User> {
        self.caller
    }

    pub fn is_admin(&self) -> bool {
        self.caller.map_or(false, User::is_admin)
    }

    pub fn is_main_admin(&self) -> bool {
        self.caller
            .map_or(false, |u| is_main_admin(u.role, &u.id, self.main_admin))
    }

    pub fn admin_limit_reached(&self) -> bool {
        self.admin_count >= MAX_ADMINS
    }

    pub fn allows(&self, action: Action<'_>) -> bool {
        let Some(caller) = self.caller else {
            return false;
        };
        match action {
            Action::ToggleBlock | Action::EditPost | Action::CreatePost => self.is_admin(),
            Action::ChangeRole(RoleChange::Promote) => {
                self.is_main_admin() && !self.admin_limit_reached()
            }
            Action::ChangeRole(RoleChange::Demote) | Action::DeleteUser | Action::DeletePost => {
                self.is_main_admin()
            }
            Action::DeleteComment(comment) => {
                self.is_main_admin() || comment.author_id() == caller.id
            }
            Action::PostComment => !caller.blocked,
            Action::React => true,
        }
    }
}

pub fn admin_count(users: &[User]) -> usize {
    users.iter().filter(|u| u.is_admin()).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Blocked,
}

impl AccountStatus {
    pub fn of(user: &User) -> Self {
        if user.blocked {
            AccountStatus::Blocked
        } else {
            AccountStatus::Active
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            AccountStatus::Active => AccountStatus::Blocked,
            AccountStatus::Blocked => AccountStatus::Active,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Blocked => "Blocked",
        }
    }

    /// Verb for the control that moves an account out of this status.
    pub fn toggle_verb(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Block",
            AccountStatus::Blocked => "Unblock",
        }
    }
}
