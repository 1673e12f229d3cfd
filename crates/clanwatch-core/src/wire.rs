// Wire DTOs for the aoe2.net WebSocket feed and their conversion into the
// typed model.
//
// The feed is loosely typed: almost every field can be missing or null. All
// of that permissiveness is absorbed here so downstream code only sees
// `SlotRecord` / `MatchSnapshot`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{AccountId, MatchId, MatchSnapshot, SlotRecord};

/// One lobby slot as sent by the feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerPayload {
    pub profile_id: Option<AccountId>,
    pub name: Option<String>,
    pub team: Option<i32>,
    pub slot: Option<u32>,
    pub color: Option<i32>,
    pub country_code: Option<String>,
    pub civ: Option<i32>,
    pub civ_name: Option<String>,
    pub rating: Option<i32>,
    pub won: Option<bool>,
    pub rec: Option<String>,
}

/// One match as sent by the feed. Only `id` is mandatory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPayload {
    pub id: MatchId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub started: Option<i64>,
    #[serde(default)]
    pub finished: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub ranked: Option<bool>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerPayload>,
}

/// Reply to a `playerrecentmatches` request.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentMatchesMessage {
    #[serde(default)]
    pub message: Option<String>,
    pub data: Vec<MatchPayload>,
}

impl From<PlayerPayload> for SlotRecord {
    fn from(p: PlayerPayload) -> Self {
        SlotRecord {
            profile_id: p.profile_id,
            name: p.name,
            team: p.team,
            slot: p.slot,
            color: p.color,
            country_code: p.country_code.filter(|c| !c.is_empty()),
            civ: p.civ,
            civ_name: p.civ_name,
            rating: p.rating,
            won: p.won,
            replay_url: p.rec.filter(|r| !r.is_empty()),
        }
    }
}

impl From<MatchPayload> for MatchSnapshot {
    fn from(m: MatchPayload) -> Self {
        let slots = m.players.into_iter().map(SlotRecord::from).collect();
        let mut snapshot = MatchSnapshot::new(m.id, slots);
        snapshot.name = m.name;
        snapshot.started = m.started.and_then(unix_seconds);
        snapshot.finished = m.finished.and_then(unix_seconds);
        snapshot.location = m.location;
        snapshot.game_type = m.game_type;
        snapshot.ranked = m.ranked;
        snapshot.server = m.server;
        snapshot
    }
}

fn unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Build the request frame asking for an account's recent matches.
pub fn recent_matches_request(profile_id: AccountId) -> String {
    serde_json::json!({
        "message": "playerrecentmatches",
        "id": profile_id.to_string(),
    })
    .to_string()
}

/// Parse a text frame from the feed.
///
/// Returns `Ok(None)` for frames that are not a recent-matches reply (pings,
/// acknowledgements, empty histories), which callers skip.
pub fn parse_recent_matches(text: &str) -> Result<Option<Vec<MatchSnapshot>>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let has_data = value
        .get("data")
        .and_then(Value::as_array)
        .is_some_and(|data| !data.is_empty());
    if !has_data {
        return Ok(None);
    }

    let message: RecentMatchesMessage = serde_json::from_value(value)?;
    Ok(Some(message.data.into_iter().map(MatchSnapshot::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "message": "playerrecentmatches",
        "id": "1001",
        "data": [{
            "id": "84512",
            "name": "clan practice",
            "started": 1600000000,
            "finished": 1600002400,
            "location": "Arabia",
            "gameType": "Random Map",
            "ranked": true,
            "server": "ukwest",
            "players": [
                {"profileId": 1001, "name": "alice", "team": 1, "countryCode": "FR",
                 "rating": 1450, "won": true, "rec": "https://example.test/rec/1"},
                {"profileId": null, "name": null, "team": -1},
                {"profileId": 2002, "name": "carol", "team": 2, "countryCode": "",
                 "rating": null, "won": false, "rec": ""}
            ]
        }]
    }"#;

    #[test]
    fn reply_decodes_into_snapshots() {
        let matches = parse_recent_matches(REPLY).unwrap().unwrap();
        assert_eq!(matches.len(), 1);

        let m = &matches[0];
        assert_eq!(m.id.as_str(), "84512");
        assert_eq!(m.location.as_deref(), Some("Arabia"));
        assert_eq!(m.finished.map(|t| t.timestamp()), Some(1600002400));
        assert_eq!(m.ranked, Some(true));
        // Empty slot removed.
        assert_eq!(m.players.len(), 2);
        assert_eq!(m.teams.len(), 2);
    }

    #[test]
    fn blank_strings_are_treated_as_absent() {
        let matches = parse_recent_matches(REPLY).unwrap().unwrap();
        let carol = &matches[0].players[1];
        assert_eq!(carol.country_code, None);
        assert_eq!(carol.replay_url, None);
        assert_eq!(carol.rating, None);
    }

    #[test]
    fn frames_without_data_are_skipped() {
        assert!(parse_recent_matches(r#"{"message":"pong"}"#).unwrap().is_none());
        assert!(parse_recent_matches(r#"{"message":"playerrecentmatches","data":[]}"#)
            .unwrap()
            .is_none());
        assert!(parse_recent_matches(r#"{"data":"oops"}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_recent_matches("{not json").is_err());
        assert!(parse_recent_matches(r#"{"data":[{"name":"no id"}]}"#).is_err());
    }

    #[test]
    fn unfinished_match_has_no_finished_marker() {
        let reply = r#"{"data":[{"id": 7, "players": [{"name": "x", "team": 1}]}]}"#;
        let matches = parse_recent_matches(reply).unwrap().unwrap();
        assert_eq!(matches[0].id.as_str(), "7");
        assert!(!matches[0].is_finished());
    }

    #[test]
    fn request_frame_carries_string_id() {
        let frame: Value = serde_json::from_str(&recent_matches_request(1001)).unwrap();
        assert_eq!(frame["message"], "playerrecentmatches");
        assert_eq!(frame["id"], "1001");
    }
}
