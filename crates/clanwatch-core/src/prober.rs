// Replay link probing.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Checks whether a replay URL actually serves a replay.
#[async_trait]
pub trait ReplayProber: Send + Sync {
    /// One request per call; no retries.
    async fn probe(&self, url: &str) -> bool;
}

/// Probes with a plain `GET`, accepting any 2xx status.
pub struct HttpReplayProber {
    http: reqwest::Client,
}

impl HttpReplayProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ReplayProber for HttpReplayProber {
    async fn probe(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(url, status = %resp.status(), "replay link is valid");
                true
            }
            Ok(resp) => {
                warn!(url, status = %resp.status(), "replay link rejected");
                false
            }
            Err(e) => {
                warn!(url, "couldn't validate the replay URL: {e}");
                false
            }
        }
    }
}
