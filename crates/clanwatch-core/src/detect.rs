// Transition detection between two consecutive snapshot sets.

use crate::model::{MatchId, MatchSnapshot};
use crate::snapshot::SnapshotSet;

/// How one match changed between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not seen on the previous poll.
    New,
    /// Seen before, still being played.
    Ongoing,
    /// Seen unfinished before, finished now. The only reportable case.
    NewlyFinished,
    /// Already finished on the previous poll (already reported, or missed).
    AlreadyFinished,
}

/// The result of comparing two consecutive snapshot sets. Every list
/// follows the order of the current set, except `vanished` which follows the
/// previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transitions {
    pub new: Vec<MatchId>,
    pub ongoing: Vec<MatchId>,
    pub finished: Vec<MatchId>,
    pub already_finished: Vec<MatchId>,
    /// Matches the source stopped reporting. Never announced.
    pub vanished: Vec<MatchId>,
}

impl Transitions {
    pub fn is_quiet(&self) -> bool {
        self.new.is_empty() && self.finished.is_empty() && self.vanished.is_empty()
    }
}

/// Classify a single match given its snapshot on the previous poll, if any.
///
/// A source that drops the finished marker of a match it already reported as
/// finished is tolerated: the match stays finished.
pub fn classify(previous: Option<&MatchSnapshot>, current: &MatchSnapshot) -> Transition {
    match previous {
        None => Transition::New,
        Some(prev) if prev.is_finished() => Transition::AlreadyFinished,
        Some(_) if current.is_finished() => Transition::NewlyFinished,
        Some(_) => Transition::Ongoing,
    }
}

/// Compare the previous poll with the current one.
///
/// Pass an empty `previous` on the first poll: every match is then new and
/// none is reported as finished.
pub fn detect(previous: &SnapshotSet, current: &SnapshotSet) -> Transitions {
    let mut transitions = Transitions::default();

    for snapshot in current.iter() {
        let id = snapshot.id.clone();
        match classify(previous.get(&snapshot.id), snapshot) {
            Transition::New => transitions.new.push(id),
            Transition::Ongoing => transitions.ongoing.push(id),
            Transition::NewlyFinished => transitions.finished.push(id),
            Transition::AlreadyFinished => transitions.already_finished.push(id),
        }
    }

    transitions.vanished = previous
        .ids()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect();

    transitions
}
