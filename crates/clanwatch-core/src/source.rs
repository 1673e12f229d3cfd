// Match source: fetches each roster account's recent matches.
//
// The concrete source talks to the aoe2.net WebSocket feed. One connection is
// opened per fetch, every roster account is queried in turn with a
// `playerrecentmatches` request, and the socket is closed again. A fetch
// either resolves every account or fails as a whole.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use crate::model::MatchSnapshot;
use crate::roster::{RosterMember, TrackedRoster};
use crate::snapshot::AccountHistory;
use crate::wire::{parse_recent_matches, recent_matches_request};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source request: {0}")]
    InvalidRequest(String),

    #[error("unable to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },

    #[error("timed out connecting to {url}")]
    Timeout { url: String },

    #[error("found matches for {resolved}/{expected} accounts")]
    Incomplete { resolved: usize, expected: usize },
}

// ---------------------------------------------------------------------------
// MatchSource
// ---------------------------------------------------------------------------

/// Supplies the recent match history of every roster account.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Histories for all roster accounts, most recent match first. Partial
    /// results are never returned.
    async fn fetch_recent_matches(
        &self,
        roster: &TrackedRoster,
    ) -> Result<Vec<AccountHistory>, SourceError>;
}

// ---------------------------------------------------------------------------
// WsMatchSource
// ---------------------------------------------------------------------------

/// WebSocket client for the aoe2.net feed.
pub struct WsMatchSource {
    url: String,
    origin: Option<String>,
    receive_attempts: usize,
    timeout: Duration,
}

impl WsMatchSource {
    pub fn new(url: String, origin: Option<String>, receive_attempts: usize, timeout: Duration) -> Self {
        // wss:// needs a process-wide rustls provider. An existing one is kept.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self {
            url,
            origin,
            receive_attempts,
            timeout,
        }
    }

    /// Query every member over an open socket. Members whose history could
    /// not be read are skipped; a send failure stops the whole sweep.
    async fn request_histories<S>(&self, ws: &mut S, roster: &TrackedRoster) -> Vec<AccountHistory>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        let mut histories = Vec::with_capacity(roster.len());

        for member in roster.members() {
            info!(name = %member.name, profile_id = member.profile_id, "requesting recent matches");
            let request = recent_matches_request(member.profile_id);
            if let Err(e) = ws.send(Message::Text(request.into())).await {
                error!("error while sending request: {e}");
                break;
            }

            if let Some(matches) = self.receive_history(ws, member).await {
                histories.push(AccountHistory {
                    profile_id: member.profile_id,
                    matches,
                });
            }
        }

        histories
    }

    /// Read frames until one carries the member's history, giving up after
    /// `receive_attempts` frames.
    async fn receive_history<S>(&self, ws: &mut S, member: &RosterMember) -> Option<Vec<MatchSnapshot>>
    where
        S: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        for remaining in (0..self.receive_attempts).rev() {
            let frame = match timeout(self.timeout, ws.next()).await {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    error!(name = %member.name, "error while reading matches: {e}");
                    return None;
                }
                Ok(None) => {
                    warn!(name = %member.name, "socket closed by the source");
                    return None;
                }
                Err(_) => {
                    warn!(name = %member.name, "timed out waiting for matches");
                    return None;
                }
            };

            let Message::Text(text) = frame else {
                debug!(remaining, "ignoring non-text frame");
                continue;
            };

            match parse_recent_matches(text.as_str()) {
                Ok(Some(matches)) => {
                    debug!(name = %member.name, count = matches.len(), "received matches");
                    return Some(matches);
                }
                Ok(None) => debug!(remaining, "ignoring message: {}", text.as_str()),
                Err(e) => warn!(name = %member.name, remaining, "malformed matches payload: {e}"),
            }
        }

        None
    }
}

#[async_trait]
impl MatchSource for WsMatchSource {
    async fn fetch_recent_matches(
        &self,
        roster: &TrackedRoster,
    ) -> Result<Vec<AccountHistory>, SourceError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SourceError::InvalidRequest(e.to_string()))?;
        if let Some(origin) = &self.origin {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| SourceError::InvalidRequest(format!("origin header: {e}")))?;
            request.headers_mut().insert(ORIGIN, value);
        }

        let (mut ws, _response) = timeout(self.timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| SourceError::Timeout {
                url: self.url.clone(),
            })?
            .map_err(|source| SourceError::Connect {
                url: self.url.clone(),
                source,
            })?;
        info!(url = %self.url, "socket connected");

        let histories = self.request_histories(&mut ws, roster).await;

        if let Err(e) = ws.close(None).await {
            debug!("error while closing socket: {e}");
        }
        info!("socket closed");

        if histories.len() != roster.len() {
            error!(
                resolved = histories.len(),
                expected = roster.len(),
                "found matches for {}/{} accounts",
                histories.len(),
                roster.len()
            );
            return Err(SourceError::Incomplete {
                resolved: histories.len(),
                expected: roster.len(),
            });
        }

        info!("found matches for {}/{} accounts", histories.len(), roster.len());
        Ok(histories)
    }
}
