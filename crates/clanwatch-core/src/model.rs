// Typed match model: slot records, teams and match snapshots.
//
// Everything here is rebuilt from scratch on every poll. Only the match id
// survives across cycles, as the key used to compare snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::partition::partition;

/// Account identifier as used by the data source (`profileId`).
pub type AccountId = i64;

// ---------------------------------------------------------------------------
// MatchId
// ---------------------------------------------------------------------------

/// Source-defined match identifier. The feed sends it either as a string or
/// as a number; both are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for MatchId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => MatchId(s),
            RawId::Number(n) => MatchId(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// SlotRecord
// ---------------------------------------------------------------------------

/// One lobby slot of one match, as reported by the source.
///
/// A slot without a display name is an empty slot and is never treated as a
/// participant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotRecord {
    pub profile_id: Option<AccountId>,
    pub name: Option<String>,
    /// Team number. Absent (or a negative sentinel) still groups players.
    pub team: Option<i32>,
    pub slot: Option<u32>,
    pub color: Option<i32>,
    pub country_code: Option<String>,
    pub civ: Option<i32>,
    pub civ_name: Option<String>,
    pub rating: Option<i32>,
    /// `None` until the source has finalized this slot's outcome.
    pub won: Option<bool>,
    /// Replay download URL candidate for this slot.
    pub replay_url: Option<String>,
}

impl SlotRecord {
    pub fn is_participant(&self) -> bool {
        self.name.is_some()
    }

    /// Display name, empty for an empty slot.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// Participants sharing one team number, in slot order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub number: Option<i32>,
    pub players: Vec<SlotRecord>,
}

impl Team {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MatchSnapshot
// ---------------------------------------------------------------------------

/// One poll's view of one match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub id: MatchId,
    /// Lobby name.
    pub name: Option<String>,
    pub started: Option<DateTime<Utc>>,
    /// Set once the match is over; absent while it is still being played.
    pub finished: Option<DateTime<Utc>>,
    /// Participants only; empty slots are removed when the snapshot is built.
    pub players: Vec<SlotRecord>,
    pub teams: Vec<Team>,
    pub location: Option<String>,
    pub game_type: Option<String>,
    pub ranked: Option<bool>,
    pub server: Option<String>,
}

impl MatchSnapshot {
    /// Build a snapshot from raw slots. Empty slots are dropped and teams are
    /// derived from the remaining participants.
    pub fn new(id: MatchId, slots: Vec<SlotRecord>) -> Self {
        let players: Vec<SlotRecord> = slots.into_iter().filter(|s| s.is_participant()).collect();
        let teams = partition(&players);
        Self {
            id,
            name: None,
            started: None,
            finished: None,
            players,
            teams,
            location: None,
            game_type: None,
            ranked: None,
            server: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// True once every participant carries a win flag.
    pub fn scores_complete(&self) -> bool {
        self.players.iter().all(|p| p.won.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: Option<&str>, team: i32) -> SlotRecord {
        SlotRecord {
            name: name.map(str::to_string),
            team: Some(team),
            ..Default::default()
        }
    }

    #[test]
    fn match_id_accepts_string_and_number() {
        let from_text: MatchId = serde_json::from_str(r#""abc-123""#).unwrap();
        let from_number: MatchId = serde_json::from_str("98765").unwrap();
        assert_eq!(from_text.as_str(), "abc-123");
        assert_eq!(from_number, MatchId::new("98765"));
    }

    #[test]
    fn snapshot_drops_empty_slots() {
        let snapshot = MatchSnapshot::new(
            "m1".into(),
            vec![slot(Some("alice"), 1), slot(None, 1), slot(Some("bob"), 2)],
        );
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.teams.len(), 2);
        assert!(!snapshot.is_finished());
    }

    #[test]
    fn scores_complete_requires_every_flag() {
        let mut snapshot =
            MatchSnapshot::new("m1".into(), vec![slot(Some("a"), 1), slot(Some("b"), 2)]);
        assert!(!snapshot.scores_complete());
        snapshot.players[0].won = Some(true);
        assert!(!snapshot.scores_complete());
        snapshot.players[1].won = Some(false);
        assert!(snapshot.scores_complete());
    }

    #[test]
    fn display_name_of_empty_slot_is_empty() {
        assert_eq!(SlotRecord::default().display_name(), "");
    }
}
