// Polling loop: fetch -> detect -> resolve -> build -> dispatch, once per
// cycle.
//
// The poller owns the only state that outlives a cycle: the previous
// snapshot set (and, in await-scores mode, the matches waiting for their
// results). One poller tracks one roster; several pollers share nothing and
// can run as independent tasks.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use clanwatch_core::config::Config;
use clanwatch_core::detect::detect;
use clanwatch_core::dispatch::{DiscordWebhook, Dispatcher};
use clanwatch_core::model::{MatchId, MatchSnapshot};
use clanwatch_core::notify::{self, RenderSettings};
use clanwatch_core::prober::{HttpReplayProber, ReplayProber};
use clanwatch_core::roster::TrackedRoster;
use clanwatch_core::snapshot::SnapshotSet;
use clanwatch_core::source::{MatchSource, SourceError, WsMatchSource};
use clanwatch_core::verdict::resolve;

// ---------------------------------------------------------------------------
// Settings and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Pause between the end of one cycle and the next fetch.
    pub interval: Duration,
    pub recent_matches_per_account: usize,
    /// Park finished matches until every participant has a result.
    pub await_scores: bool,
    pub render: RenderSettings,
}

impl PollerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            recent_matches_per_account: config.source.recent_matches_per_account,
            await_scores: config.polling.await_scores,
            render: config.render_settings(),
        }
    }
}

/// What happened during one polling cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// False when the fetch failed and the cycle was skipped.
    pub fetched: bool,
    pub new: Vec<MatchId>,
    /// Matches seen finishing during this cycle.
    pub finished: Vec<MatchId>,
    /// Notifications delivered.
    pub announced: Vec<MatchId>,
    /// Notifications that could not be delivered. They are not retried.
    pub failed: Vec<MatchId>,
    /// Finished matches still waiting for their results.
    pub pending: Vec<MatchId>,
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller {
    roster: TrackedRoster,
    source: Box<dyn MatchSource>,
    prober: Box<dyn ReplayProber>,
    dispatcher: Box<dyn Dispatcher>,
    settings: PollerSettings,
    previous: SnapshotSet,
    pending: Vec<MatchId>,
}

impl Poller {
    pub fn new(
        roster: TrackedRoster,
        source: Box<dyn MatchSource>,
        prober: Box<dyn ReplayProber>,
        dispatcher: Box<dyn Dispatcher>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            roster,
            source,
            prober,
            dispatcher,
            settings,
            previous: SnapshotSet::new(),
            pending: Vec::new(),
        }
    }

    /// Wire the WebSocket source, HTTP prober and Discord webhook from config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = WsMatchSource::new(
            config.source.url.clone(),
            config.source.origin.clone(),
            config.source.receive_attempts,
            config.http_timeout(),
        );
        let prober = HttpReplayProber::new(config.http_timeout())
            .context("failed to build replay prober")?;
        let dispatcher = DiscordWebhook::new(
            config.webhook.url.clone(),
            config.post_delay(),
            config.http_timeout(),
        )
        .context("failed to build webhook client")?;

        Ok(Self::new(
            config.roster(),
            Box::new(source),
            Box::new(prober),
            Box::new(dispatcher),
            PollerSettings::from_config(config),
        ))
    }

    /// The snapshot set the next cycle will be compared against.
    pub fn previous(&self) -> &SnapshotSet {
        &self.previous
    }

    pub fn pending(&self) -> &[MatchId] {
        &self.pending
    }

    async fn fetch(&self) -> Result<SnapshotSet, SourceError> {
        let histories = self.source.fetch_recent_matches(&self.roster).await?;
        Ok(SnapshotSet::from_histories(
            histories,
            self.settings.recent_matches_per_account,
        ))
    }

    /// Take the baseline snapshot. Nothing is announced for it.
    pub async fn initialize(&mut self) -> Result<(), SourceError> {
        let baseline = self.fetch().await?;
        info!(matches = baseline.len(), "recent matches initialized");
        self.previous = baseline;
        Ok(())
    }

    /// Run one cycle against the current baseline.
    ///
    /// A failed fetch leaves all state untouched. Every match detected as
    /// finished is consumed during this cycle (or parked, in await-scores
    /// mode) whether or not its notification could be delivered.
    pub async fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let mut current = match self.fetch().await {
            Ok(current) => current,
            Err(e) => {
                warn!("couldn't refresh matches, keeping previous state: {e}");
                report.pending = self.pending.clone();
                return report;
            }
        };
        report.fetched = true;

        let transitions = detect(&self.previous, &current);
        for id in &transitions.new {
            info!(match_id = %id, "new match started");
        }
        for id in &transitions.vanished {
            debug!(match_id = %id, "match left the recent window");
        }

        let mut ready = self.take_ready_pending(&current);

        for id in transitions.finished {
            info!(match_id = %id, "ongoing match finished");
            report.finished.push(id.clone());

            let complete = current.get(&id).is_some_and(MatchSnapshot::scores_complete);
            if self.settings.await_scores && !complete {
                info!(match_id = %id, "scores are not set yet");
                self.pending.push(id);
            } else {
                ready.push(id);
            }
        }

        for id in ready {
            let Some(snapshot) = current.get(&id) else {
                continue;
            };
            if self.announce(snapshot).await {
                report.announced.push(id);
            } else {
                report.failed.push(id);
            }
        }

        let restored = current.carry_finished(&self.previous);
        if restored > 0 {
            warn!(restored, "source reverted finished matches to ongoing");
        }
        self.previous = current;

        report.new = transitions.new;
        report.pending = self.pending.clone();
        info!(
            matches = self.previous.len(),
            announced = report.announced.len(),
            pending = report.pending.len(),
            "matches refreshed"
        );
        report
    }

    /// Pull parked matches whose results are now complete. Matches that left
    /// the source are dropped; the rest stay parked.
    fn take_ready_pending(&mut self, current: &SnapshotSet) -> Vec<MatchId> {
        let mut ready = Vec::new();
        for id in std::mem::take(&mut self.pending) {
            match current.get(&id) {
                Some(snapshot) if snapshot.scores_complete() => {
                    info!(match_id = %id, "we received the scores");
                    ready.push(id);
                }
                Some(_) => self.pending.push(id),
                None => warn!(match_id = %id, "match left the source before its scores were set"),
            }
        }
        ready
    }

    /// Resolve, build and dispatch one notification. Returns whether it was
    /// delivered; failures are logged and never retried.
    async fn announce(&self, snapshot: &MatchSnapshot) -> bool {
        let verdict = resolve(snapshot, &self.roster);
        if verdict.internal {
            info!(match_id = %snapshot.id, "this was an internal match");
        } else if verdict.applicable && verdict.won {
            info!(match_id = %snapshot.id, "the clan is victorious");
        } else if verdict.applicable {
            info!(match_id = %snapshot.id, "the clan has been defeated");
        }

        let payload = notify::build(
            snapshot,
            &verdict,
            &self.roster,
            self.prober.as_ref(),
            &self.settings.render,
        )
        .await;

        match self.dispatcher.dispatch(&payload).await {
            Ok(()) => {
                info!(match_id = %snapshot.id, "notification sent");
                true
            }
            Err(e) => {
                error!(match_id = %snapshot.id, "failed to deliver notification: {e}");
                false
            }
        }
    }

    /// Initialize, then poll forever. Only a failed initialization returns.
    pub async fn run(mut self) -> Result<(), SourceError> {
        if let Err(e) = self.initialize().await {
            error!("couldn't initialize matches: {e}");
            return Err(e);
        }

        loop {
            tokio::time::sleep(self.settings.interval).await;
            self.poll_once().await;
        }
    }
}
