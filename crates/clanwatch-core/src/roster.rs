// The tracked roster: accounts whose matches produce notifications.

use std::collections::HashSet;

use serde::Deserialize;

use crate::model::AccountId;

/// One tracked account, as listed under `[[players]]` in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterMember {
    pub profile_id: AccountId,
    pub name: String,
}

/// Fixed set of tracked accounts. Loaded once at startup, never mutated.
#[derive(Debug, Clone, Default)]
pub struct TrackedRoster {
    members: Vec<RosterMember>,
    ids: HashSet<AccountId>,
}

impl TrackedRoster {
    pub fn new(members: Vec<RosterMember>) -> Self {
        let ids = members.iter().map(|m| m.profile_id).collect();
        Self { members, ids }
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.ids.contains(&id)
    }

    /// Configured display name for a tracked account.
    pub fn display_name(&self, id: AccountId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.profile_id == id)
            .map(|m| m.name.as_str())
    }

    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
