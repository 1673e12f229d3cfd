// Integration tests for the WebSocket match source against a local server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

use clanwatch_core::roster::{RosterMember, TrackedRoster};
use clanwatch_core::source::{MatchSource, SourceError, WsMatchSource};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Account that the fake feed knows nothing about.
const UNKNOWN_ACCOUNT: i64 = 404;

fn history(profile_id: i64) -> Value {
    let data = if profile_id == UNKNOWN_ACCOUNT {
        json!([])
    } else {
        json!([
            {
                "id": format!("{profile_id}-2"),
                "started": 1600003000,
                "players": [{ "profileId": profile_id, "name": "p", "team": 1 }]
            },
            {
                "id": format!("{profile_id}-1"),
                "started": 1600000000,
                "finished": 1600002000,
                "players": [{ "profileId": profile_id, "name": "p", "team": 1, "won": true }]
            }
        ])
    };
    json!({ "message": "playerrecentmatches", "data": data })
}

/// Serve one connection: every request gets an unrelated frame, then the
/// account's history. Returns the server URL and the Origin header seen.
async fn spawn_feed() -> (String, Arc<Mutex<Option<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let origin = Arc::new(Mutex::new(None));
    let seen = origin.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |req: &Request, resp: Response| {
            *seen.lock().unwrap() = req
                .headers()
                .get("origin")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        while let Some(Ok(frame)) = ws.next().await {
            let Message::Text(text) = frame else {
                continue;
            };
            let request: Value = serde_json::from_str(text.as_str()).unwrap();
            let profile_id: i64 = request["id"].as_str().unwrap().parse().unwrap();

            let ack = json!({ "message": "subscribed" }).to_string();
            if ws.send(Message::Text(ack.into())).await.is_err() {
                break;
            }
            let reply = history(profile_id).to_string();
            if ws.send(Message::Text(reply.into())).await.is_err() {
                break;
            }
        }
    });

    (format!("ws://{addr}"), origin)
}

fn roster(ids: &[i64]) -> TrackedRoster {
    TrackedRoster::new(
        ids.iter()
            .map(|&profile_id| RosterMember { profile_id, name: format!("p{profile_id}") })
            .collect(),
    )
}

fn source(url: String) -> WsMatchSource {
    WsMatchSource::new(
        url,
        Some("https://www.aoe2.net".into()),
        2,
        Duration::from_secs(5),
    )
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn fetches_every_account_in_roster_order() {
    let (url, origin) = spawn_feed().await;

    let histories = source(url)
        .fetch_recent_matches(&roster(&[11, 22]))
        .await
        .unwrap();

    assert_eq!(histories.len(), 2);
    assert_eq!(histories[0].profile_id, 11);
    assert_eq!(histories[1].profile_id, 22);

    let matches = &histories[0].matches;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id.as_str(), "11-2");
    assert!(!matches[0].is_finished());
    assert!(matches[1].is_finished());
    assert_eq!(matches[1].players[0].won, Some(true));

    assert_eq!(origin.lock().unwrap().as_deref(), Some("https://www.aoe2.net"));
}

#[tokio::test]
async fn missing_history_fails_the_whole_fetch() {
    let (url, _) = spawn_feed().await;

    let result = source(url)
        .fetch_recent_matches(&roster(&[11, UNKNOWN_ACCOUNT, 22]))
        .await;

    match result {
        Err(SourceError::Incomplete { resolved, expected }) => {
            assert_eq!(resolved, 2);
            assert_eq!(expected, 3);
        }
        other => panic!("expected an incomplete fetch, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_feed_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = source(format!("ws://{addr}"))
        .fetch_recent_matches(&roster(&[11]))
        .await;
    assert!(matches!(result, Err(SourceError::Connect { .. })));
}

#[tokio::test]
async fn malformed_url_is_rejected_before_connecting() {
    let result = source("not a url".into())
        .fetch_recent_matches(&roster(&[11]))
        .await;
    assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
}
