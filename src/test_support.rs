//! Fixtures and in-process mock servers shared by the unit tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

use crate::model::{Match, MatchEvent, MatchEventType, MatchStatus, Team};

pub(crate) fn sample_match(id: &str) -> Match {
    Match {
        id: id.to_string(),
        competition: None,
        home_team: Team {
            id: "t1".into(),
            name: "Harbor FC".into(),
            short_name: Some("HFC".into()),
            logo_url: None,
        },
        away_team: Team {
            id: "t2".into(),
            name: "Mill Town".into(),
            short_name: None,
            logo_url: None,
        },
        start_time: Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap(),
        status: MatchStatus::Scheduled,
        home_score: 0,
        away_score: 0,
        current_minute: None,
        live_started_at: None,
        events: None,
        lineups: None,
        stats: None,
    }
}

pub(crate) fn sample_event(id: &str, match_id: &str, minute: u16) -> MatchEvent {
    MatchEvent {
        id: id.to_string(),
        match_id: match_id.to_string(),
        minute,
        extra_minute: None,
        event_type: MatchEventType::Goal,
        team_id: Some("t1".into()),
        player: None,
        secondary_player: None,
        position_x: None,
        position_y: None,
        created_at: Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()
            + chrono::Duration::minutes(i64::from(minute)),
    }
}

/// A fresh, empty directory, removed when the guard drops.
pub(crate) fn temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("livescore-test-")
        .tempdir()
        .unwrap()
}

fn match_json(id: &str, status: &str, home: u32, away: u32) -> Value {
    json!({
        "id": id,
        "homeTeam": {"id": "t1", "name": "Harbor FC"},
        "awayTeam": {"id": "t2", "name": "Mill Town"},
        "startTime": "2026-10-19T18:00:00Z",
        "status": status,
        "homeScore": home,
        "awayScore": away,
    })
}

/// REST API stand-in that counts requests per path.
pub(crate) struct MockApi {
    addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockApi {
    pub(crate) async fn spawn() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let app = Router::new().fallback(route).with_state(hits.clone());
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(error = %err, "mock api exited with error");
            }
        });
        Self { addr, hits }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or_default()
    }
}

async fn route(State(hits): State<Arc<Mutex<HashMap<String, usize>>>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *hits.lock().unwrap().entry(path.clone()).or_default() += 1;
    let body = match path.as_str() {
        "/matches" => json!([match_json("m1", "live", 1, 0), match_json("m2", "scheduled", 0, 0)]),
        "/matches/live" => json!([match_json("m1", "live", 1, 0)]),
        "/matches/featured" => Value::Null,
        "/matches/m1" => match_json("m1", "live", 1, 0),
        "/store/categories" => json!([{"id": "c1", "name": "Kits", "slug": "kits"}]),
        "/store/products" => json!([
            {"id": "p1", "name": "Home Shirt", "price": 59.99, "stock": 3, "isFeatured": true},
            {"id": "p2", "name": "Scarf", "price": 15, "stock": 10}
        ]),
        "/store/banners" => json!([{"id": "b1", "title": "New kit", "image": "kit.png"}]),
        "/broken" => return (StatusCode::OK, "not json").into_response(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(body).into_response()
}

/// Socket.IO server stand-in speaking the Engine.IO v4 websocket framing.
///
/// Frames pushed with [`MockSocketServer::push`] are written verbatim to the
/// connected client; frames the client sends (after the handshake) are
/// available through [`MockSocketServer::next_frame`].
pub(crate) struct MockSocketServer {
    addr: SocketAddr,
    kick: Arc<Notify>,
    rejection: Arc<Mutex<Option<String>>>,
    push_tx: mpsc::UnboundedSender<String>,
    received_rx: mpsc::UnboundedReceiver<String>,
    auth_rx: mpsc::UnboundedReceiver<String>,
}

impl MockSocketServer {
    pub(crate) async fn spawn() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (push_tx, push_rx) = mpsc::unbounded_channel::<String>();
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let push_rx = Arc::new(tokio::sync::Mutex::new(push_rx));
        let kick = Arc::new(Notify::new());
        let rejection: Arc<Mutex<Option<String>>> = Arc::default();
        let (server_kick, server_rejection) = (kick.clone(), rejection.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let push_rx = push_rx.clone();
                let received_tx = received_tx.clone();
                let auth_tx = auth_tx.clone();
                let kick = server_kick.clone();
                let rejection = server_rejection.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let open = r#"0{"sid":"mock","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
                    if ws.send(Message::text(open.to_string())).await.is_err() {
                        return;
                    }
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            let _ = auth_tx.send(text.as_str().to_string());
                        }
                        _ => return,
                    }
                    let rejected = rejection.lock().unwrap().take();
                    if let Some(reason) = rejected {
                        let frame = format!(r#"44{}"#, json!({ "message": reason }));
                        let _ = ws.send(Message::text(frame)).await;
                        let _ = ws.close(None).await;
                        return;
                    }
                    if ws.send(Message::text(r#"40{"sid":"mock-sio"}"#.to_string())).await.is_err() {
                        return;
                    }
                    let mut push_rx = push_rx.lock().await;
                    loop {
                        tokio::select! {
                            _ = kick.notified() => {
                                let _ = ws.close(None).await;
                                return;
                            }
                            pushed = push_rx.recv() => match pushed {
                                Some(frame) => {
                                    if ws.send(Message::text(frame)).await.is_err() {
                                        return;
                                    }
                                }
                                None => return,
                            },
                            incoming = ws.next() => match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = received_tx.send(text.as_str().to_string());
                                }
                                Some(Ok(_)) => {}
                                _ => return,
                            },
                        }
                    }
                });
            }
        });
        Self {
            addr,
            kick,
            rejection,
            push_tx,
            received_rx,
            auth_rx,
        }
    }

    pub(crate) fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Close the current client connection from the server side.
    pub(crate) fn drop_client(&self) {
        self.kick.notify_one();
    }

    /// Answer the next handshake with a connect error carrying `reason`.
    pub(crate) fn reject_next(&self, reason: &str) {
        *self.rejection.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn push(&self, frame: impl Into<String>) {
        self.push_tx.send(frame.into()).unwrap();
    }

    /// The Socket.IO connect frame the client sent, e.g. `40{"token":"..."}`.
    pub(crate) async fn next_connect(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.auth_rx.recv())
            .await
            .expect("timed out waiting for connect")
            .expect("server gone")
    }

    pub(crate) async fn next_frame(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.received_rx.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("server gone")
    }
}

/// Poll `check` until it holds or five seconds pass.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
