//! The capability matrix: one static `role × resource × action` table.
//! Every role-gated decision in the crate goes through [`Policy::check`];
//! no inline role comparisons anywhere else.

use crate::auth::Identity;
use crate::model::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Room,
    Meeting,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    ReadOwn,
    Update,
    UpdateOwn,
    Delete,
    DeleteOwn,
    ListAll,
}

impl Action {
    /// The ownership-scoped fallback for an any-resource action.
    fn own_variant(self) -> Option<Action> {
        match self {
            Action::Read => Some(Action::ReadOwn),
            Action::Update => Some(Action::UpdateOwn),
            Action::Delete => Some(Action::DeleteOwn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Reference behavior lets members read/list arbitrary users; flagged as
    /// likely unintended, so it is a switch rather than hard-wired.
    pub members_can_read_any_user: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            members_can_read_any_user: true,
        }
    }
}

pub struct Policy {
    config: PolicyConfig,
}

impl Policy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// The static table. Admins hold every capability; the match spells out
    /// the member column.
    fn allows(&self, role: Role, resource: Resource, action: Action) -> bool {
        if role == Role::Admin {
            return true;
        }
        match (resource, action) {
            (Resource::Room, Action::Read | Action::ReadOwn | Action::ListAll) => true,
            (Resource::Room, _) => false,

            (Resource::Meeting, Action::Create) => true,
            (Resource::Meeting, Action::ReadOwn | Action::UpdateOwn | Action::DeleteOwn) => true,
            (Resource::Meeting, _) => false,

            (Resource::User, Action::Read | Action::ListAll) => {
                self.config.members_can_read_any_user
            }
            (Resource::User, Action::ReadOwn | Action::UpdateOwn) => true,
            (Resource::User, _) => false,
        }
    }

    /// Decide `(identity, resource, action)`. When the any-resource action is
    /// denied, the own-scoped variant is consulted, gated by the caller's
    /// ownership predicate. The policy never inspects resources itself.
    /// Never errors.
    pub fn check(
        &self,
        identity: &Identity,
        resource: Resource,
        action: Action,
        is_owner: impl FnOnce() -> bool,
    ) -> Decision {
        if self.allows(identity.role, resource, action) {
            return Decision::Allow;
        }
        if let Some(own) = action.own_variant()
            && self.allows(identity.role, resource, own)
            && is_owner()
        {
            return Decision::Allow;
        }
        Decision::Deny
    }
}
