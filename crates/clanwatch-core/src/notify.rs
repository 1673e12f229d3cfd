// Notification building: turns a finished match and its verdict into a
// render-ready payload (headline, embed title, markdown body, accent).
//
// Rendering is pure. The only I/O is replay link probing, which goes through
// the injected `ReplayProber`.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::model::{AccountId, MatchSnapshot, SlotRecord};
use crate::prober::ReplayProber;
use crate::roster::TrackedRoster;
use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const NEUTRAL_HEADLINE: &str = "Match results.";

pub const DEFAULT_PROFILE_URL: &str = "https://www.aoe2.net/#profile-{id}";

const GLOBE: &str = ":globe_with_meridians:";
const CROWN: &str = ":crown:";
const VERSUS: &str = "\n**Versus**\n";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Embed accent colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    /// Neutral: internal, free-for-all or solo results.
    Blue,
    Green,
    Red,
}

impl Accent {
    /// RGB value as used by Discord embeds.
    pub fn rgb(self) -> u32 {
        match self {
            Accent::Blue => 7_506_394,
            Accent::Green => 5_089_895,
            Accent::Red => 10_961_731,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub headline: String,
    pub title: String,
    /// Markdown body, including the replay line when a replay was found.
    pub body: String,
    pub accent: Accent,
    pub replay: Option<String>,
}

/// Rendering knobs taken from the `[render]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Profile link template; `{id}` is replaced by the account id.
    pub profile_url: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            profile_url: DEFAULT_PROFILE_URL.to_string(),
        }
    }
}

impl RenderSettings {
    fn profile_link(&self, id: Option<AccountId>) -> String {
        let id = id.map(|i| i.to_string()).unwrap_or_default();
        self.profile_url.replace("{id}", &id)
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Probe replay candidates, then render the payload. Never fails.
pub async fn build(
    snapshot: &MatchSnapshot,
    verdict: &Verdict,
    roster: &TrackedRoster,
    prober: &dyn ReplayProber,
    settings: &RenderSettings,
) -> NotificationPayload {
    let replay = resolve_replay(snapshot, prober).await;
    render(snapshot, verdict, roster, settings, replay)
}

/// Find the first replay URL that probes successfully.
///
/// Candidates come from the participants' replay fields in slot order. Each
/// distinct URL is probed at most once and probing stops at the first hit.
pub async fn resolve_replay(snapshot: &MatchSnapshot, prober: &dyn ReplayProber) -> Option<String> {
    info!(match_id = %snapshot.id, "looking for a valid replay link");
    let mut tried: HashSet<&str> = HashSet::new();

    for url in snapshot.players.iter().filter_map(|p| p.replay_url.as_deref()) {
        if !tried.insert(url) {
            continue;
        }
        if prober.probe(url).await {
            info!(match_id = %snapshot.id, url, "found a valid replay link");
            return Some(url.to_string());
        }
    }

    debug!(match_id = %snapshot.id, tried = tried.len(), "no replay link available");
    None
}

/// Render the payload for an already resolved replay link.
pub fn render(
    snapshot: &MatchSnapshot,
    verdict: &Verdict,
    roster: &TrackedRoster,
    settings: &RenderSettings,
    replay: Option<String>,
) -> NotificationPayload {
    let mut body = body(snapshot, settings);
    if let Some(url) = &replay {
        body.push_str(&format!("\nReplay: **[Download]({url})**"));
    }

    NotificationPayload {
        headline: headline(verdict, roster),
        title: title(snapshot),
        body,
        accent: accent(verdict),
        replay,
    }
}

pub fn accent(verdict: &Verdict) -> Accent {
    match (verdict.applicable, verdict.won) {
        (true, true) => Accent::Green,
        (true, false) => Accent::Red,
        (false, _) => Accent::Blue,
    }
}

/// "Alice and Bob are victorious." / "Alice has been defeated." /
/// "Match results." when there is no win/loss framing.
pub fn headline(verdict: &Verdict, roster: &TrackedRoster) -> String {
    if !verdict.applicable || verdict.tracked.is_empty() {
        return NEUTRAL_HEADLINE.to_string();
    }

    let names: Vec<String> = verdict
        .tracked
        .iter()
        .map(|p| capitalize(tracked_name(p, roster)))
        .collect();
    let plural = names.len() > 1;

    let outcome = match (verdict.won, plural) {
        (true, false) => "is victorious.",
        (true, true) => "are victorious.",
        (false, false) => "has been defeated.",
        (false, true) => "have been defeated.",
    };
    format!("{} {outcome}", join_names(&names))
}

/// Team sizes joined by " vs ", followed by the map: "2 vs 2 on Arabia".
pub fn title(snapshot: &MatchSnapshot) -> String {
    let sizes: Vec<String> = snapshot.teams.iter().map(|t| t.len().to_string()).collect();
    let mut title = sizes.join(" vs ");
    if let Some(location) = &snapshot.location {
        title.push_str(&format!(" on {location}"));
    }
    title
}

/// Team listing plus game and server lines (without the replay line).
pub fn body(snapshot: &MatchSnapshot, settings: &RenderSettings) -> String {
    let teams: Vec<String> = snapshot
        .teams
        .iter()
        .map(|team| {
            team.players
                .iter()
                .map(|p| player_line(p, settings))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();

    let mut body = teams.join(VERSUS);

    let ranked = if snapshot.ranked == Some(true) { "Ranked " } else { "" };
    let game_type = snapshot.game_type.as_deref().unwrap_or_default();
    body.push_str(&format!("\n\nGame: **{ranked}{game_type}**"));

    if let Some(server) = &snapshot.server {
        body.push_str(&format!("\nServer: **{server}**"));
    }
    body
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn player_line(player: &SlotRecord, settings: &RenderSettings) -> String {
    let marker = match &player.country_code {
        Some(code) => format!(":flag_{}:", code.to_lowercase()),
        None => GLOBE.to_string(),
    };

    let mut label = player.display_name().to_string();
    if let Some(rating) = player.rating.filter(|&r| r != 0) {
        label.push_str(&format!(" ({rating})"));
    }

    let link = settings.profile_link(player.profile_id);
    let mut line = format!("{marker} [{label}]({link})");
    if player.won == Some(true) {
        line.push(' ');
        line.push_str(CROWN);
    }
    line
}

fn tracked_name<'a>(player: &'a SlotRecord, roster: &'a TrackedRoster) -> &'a str {
    match (&player.name, player.profile_id) {
        (Some(name), _) => name.as_str(),
        (None, Some(id)) => roster.display_name(id).unwrap_or_default(),
        (None, None) => "",
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// "A", "A and B", "A, B and C".
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
