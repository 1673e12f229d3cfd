// Snapshot sets: every match visible for the roster at one poll.

use std::collections::HashMap;

use crate::model::{AccountId, MatchId, MatchSnapshot};

/// Recent matches reported for one roster account, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountHistory {
    pub profile_id: AccountId,
    pub matches: Vec<MatchSnapshot>,
}

/// Match id -> snapshot mapping that remembers insertion order.
///
/// Iteration follows insertion order so that everything derived from a set
/// (transition lists, notification order) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    matches: Vec<MatchSnapshot>,
    index: HashMap<MatchId, usize>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the `per_account` most recent matches of every account and
    /// deduplicate by match id. When a match shows up under several accounts
    /// the first occurrence wins.
    pub fn from_histories(histories: Vec<AccountHistory>, per_account: usize) -> Self {
        histories
            .into_iter()
            .flat_map(|h| h.matches.into_iter().take(per_account))
            .collect()
    }

    /// Insert a snapshot unless its id is already present. Returns whether it
    /// was inserted.
    pub fn insert(&mut self, snapshot: MatchSnapshot) -> bool {
        if self.index.contains_key(&snapshot.id) {
            return false;
        }
        self.index.insert(snapshot.id.clone(), self.matches.len());
        self.matches.push(snapshot);
        true
    }

    pub fn get(&self, id: &MatchId) -> Option<&MatchSnapshot> {
        self.index.get(id).map(|&i| &self.matches[i])
    }

    pub fn contains(&self, id: &MatchId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchSnapshot> {
        self.matches.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MatchId> {
        self.matches.iter().map(|m| &m.id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Copy `finished` markers forward from the previous poll.
    ///
    /// A match that was finished stays finished even if the source reports it
    /// without the marker again, so it can never look newly finished twice.
    /// Returns the number of markers restored.
    pub fn carry_finished(&mut self, previous: &SnapshotSet) -> usize {
        let mut restored = 0;
        for snapshot in &mut self.matches {
            if snapshot.finished.is_some() {
                continue;
            }
            if let Some(finished) = previous.get(&snapshot.id).and_then(|p| p.finished) {
                snapshot.finished = Some(finished);
                restored += 1;
            }
        }
        restored
    }
}

impl FromIterator<MatchSnapshot> for SnapshotSet {
    fn from_iter<I: IntoIterator<Item = MatchSnapshot>>(iter: I) -> Self {
        let mut set = SnapshotSet::new();
        for snapshot in iter {
            set.insert(snapshot);
        }
        set
    }
}
