// Verdict resolution: what a finished match means for the tracked roster.

use crate::model::{MatchSnapshot, SlotRecord};
use crate::roster::TrackedRoster;

/// Outcome of a finished match relative to the tracked roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// True for a two-team match that is not internal: the notification gets
    /// a win/loss headline.
    pub applicable: bool,
    /// At least one tracked participant won. Always false when not applicable.
    pub won: bool,
    /// Tracked accounts make up more than half of the lobby.
    pub internal: bool,
    /// Tracked participants in slot order.
    pub tracked: Vec<SlotRecord>,
}

/// Resolve the verdict of `snapshot` for `roster`. Pure.
pub fn resolve(snapshot: &MatchSnapshot, roster: &TrackedRoster) -> Verdict {
    let participants = snapshot.players.iter().filter(|p| p.is_participant());
    let total = participants.clone().count();

    let tracked: Vec<SlotRecord> = participants
        .filter(|p| p.profile_id.is_some_and(|id| roster.contains(id)))
        .cloned()
        .collect();

    // Exactly half is still a clan result (2 of a 2v2, for instance).
    let internal = tracked.len() * 2 > total;
    let applicable = snapshot.teams.len() == 2 && !internal;
    let won = applicable && tracked.iter().any(|p| p.won == Some(true));

    Verdict {
        applicable,
        won,
        internal,
        tracked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountId;
    use crate::roster::RosterMember;

    fn player(id: AccountId, name: &str, team: i32, won: Option<bool>) -> SlotRecord {
        SlotRecord {
            profile_id: Some(id),
            name: Some(name.into()),
            team: Some(team),
            won,
            ..Default::default()
        }
    }

    fn roster(ids: &[AccountId]) -> TrackedRoster {
        TrackedRoster::new(
            ids.iter()
                .map(|&id| RosterMember { profile_id: id, name: format!("member{id}") })
                .collect(),
        )
    }

    fn two_v_two(a_won: bool) -> MatchSnapshot {
        MatchSnapshot::new(
            "m1".into(),
            vec![
                player(1, "a", 1, Some(a_won)),
                player(2, "b", 1, Some(a_won)),
                player(3, "c", 2, Some(!a_won)),
                player(4, "d", 2, Some(!a_won)),
            ],
        )
    }

    #[test]
    fn half_the_lobby_is_still_a_clan_result() {
        let v = resolve(&two_v_two(true), &roster(&[1, 2]));
        assert!(v.applicable);
        assert!(v.won);
        assert!(!v.internal);
        let names: Vec<&str> = v.tracked.iter().map(SlotRecord::display_name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn swapping_win_flags_flips_outcome_only() {
        let r = roster(&[1, 2]);
        let win = resolve(&two_v_two(true), &r);
        let loss = resolve(&two_v_two(false), &r);
        assert_eq!(win.applicable, loss.applicable);
        assert!(win.won);
        assert!(!loss.won);
    }

    #[test]
    fn majority_of_lobby_is_internal() {
        for flags in [true, false] {
            let v = resolve(&two_v_two(flags), &roster(&[1, 2, 3]));
            assert!(v.internal);
            assert!(!v.applicable);
            assert!(!v.won);
        }
    }

    #[test]
    fn three_teams_is_not_applicable() {
        let snapshot = MatchSnapshot::new(
            "ffa".into(),
            vec![
                player(1, "a", 1, Some(true)),
                player(2, "b", 2, Some(false)),
                player(3, "c", 3, Some(false)),
            ],
        );
        let v = resolve(&snapshot, &roster(&[1]));
        assert!(!v.applicable);
        assert!(!v.won);
        assert!(!v.internal);
        assert_eq!(v.tracked.len(), 1);
    }

    #[test]
    fn no_tracked_participants_is_an_applicable_loss() {
        let v = resolve(&two_v_two(true), &roster(&[99]));
        assert!(v.applicable);
        assert!(!v.won);
        assert!(v.tracked.is_empty());
    }

    #[test]
    fn unknown_win_flag_does_not_count_as_a_win() {
        let snapshot = MatchSnapshot::new(
            "m2".into(),
            vec![player(1, "a", 1, None), player(3, "c", 2, None)],
        );
        let v = resolve(&snapshot, &roster(&[1]));
        assert!(v.applicable);
        assert!(!v.won);
    }

    #[test]
    fn slots_without_account_are_never_tracked() {
        let mut anonymous = player(0, "anon", 1, Some(true));
        anonymous.profile_id = None;
        let snapshot = MatchSnapshot::new(
            "m3".into(),
            vec![anonymous, player(3, "c", 2, Some(false))],
        );
        let v = resolve(&snapshot, &roster(&[1]));
        assert!(v.tracked.is_empty());
    }
}
