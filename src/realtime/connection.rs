use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

use super::messages::{ClientMessage, GlobalEventPayload, ServerMessage};
use super::protocol::{Packet, ENGINE_IO_PATH};
use crate::bridge::LiveBannerBridge;
use crate::config::ClientConfig;
use crate::error::{LiveScoreError, Result};
use crate::model::{LiveBannerData, MatchEventType, MatchPatch};
use crate::store::MatchStore;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

enum Command {
    Emit(ClientMessage),
    Shutdown,
}

enum SessionEnd {
    Shutdown,
    Closed,
}

struct SocketHandle {
    generation: u64,
    commands: mpsc::UnboundedSender<Command>,
    _task: JoinHandle<()>,
}

#[derive(Default)]
struct Link {
    handle: Option<SocketHandle>,
    next_generation: u64,
    attempts: u32,
    connected: bool,
    global_listeners: bool,
    /// Match the match-scoped listeners were last registered for.
    match_listeners: Option<String>,
    joined_matches: Vec<String>,
    live_feed: bool,
}

impl Link {
    fn owns(&self, generation: u64) -> bool {
        self.handle.as_ref().map(|h| h.generation) == Some(generation)
    }

    fn tear_down(&mut self) -> Option<SocketHandle> {
        self.connected = false;
        self.global_listeners = false;
        self.match_listeners = None;
        self.joined_matches.clear();
        self.live_feed = false;
        self.handle.take()
    }
}

struct Inner {
    socket_url: String,
    max_attempts: u32,
    reconnection_delay: Duration,
    store: MatchStore,
    banner: Option<LiveBannerBridge>,
    link: Mutex<Link>,
}

/// Owner of the single realtime connection.
///
/// The socket lives in a background task; this handle only flips shared
/// state and queues outbound messages. Connection failures are counted and
/// never surfaced: after `reconnection_attempts` consecutive failures the
/// handle is dropped and this manager will not try again.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(config: &ClientConfig, store: MatchStore, banner: Option<LiveBannerBridge>) -> Self {
        Self {
            inner: Arc::new(Inner {
                socket_url: config.socket_url.trim_end_matches('/').to_string(),
                max_attempts: config.reconnection_attempts,
                reconnection_delay: config.reconnection_delay,
                store,
                banner,
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Open the connection with `token`. Does nothing (and returns `false`)
    /// when a handle already exists, the attempt budget is spent, or no Tokio
    /// runtime is available.
    #[instrument(skip(self, token))]
    pub fn connect(&self, token: &str) -> bool {
        let mut link = self.inner.lock();
        if link.handle.is_some() {
            debug!("socket handle already exists");
            return false;
        }
        if link.attempts >= self.inner.max_attempts {
            debug!(attempts = link.attempts, "reconnection budget exhausted");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, cannot open realtime connection");
            return false;
        };

        link.next_generation += 1;
        let generation = link.next_generation;
        let (commands, command_rx) = mpsc::unbounded_channel();
        link.global_listeners = true;
        let task = runtime.spawn(run_socket(
            self.inner.clone(),
            generation,
            token.to_string(),
            command_rx,
        ));
        link.handle = Some(SocketHandle {
            generation,
            commands,
            _task: task,
        });
        info!(generation, url = %self.inner.socket_url, "realtime connection started");
        true
    }

    /// Register the match-scoped listeners for `match_id` (replacing any
    /// earlier registration) and join its room.
    pub fn join_match(&self, match_id: &str) -> bool {
        let mut link = self.inner.lock();
        let Some(commands) = link.handle.as_ref().map(|h| h.commands.clone()) else {
            debug!(match_id, "no socket, not joining match");
            return false;
        };
        if let Some(previous) = link.match_listeners.replace(match_id.to_string()) {
            debug!(previous = %previous, match_id, "replacing match listeners");
        }
        if !link.joined_matches.iter().any(|m| m == match_id) {
            link.joined_matches.push(match_id.to_string());
        }
        drop(link);
        commands
            .send(Command::Emit(ClientMessage::JoinMatch(match_id.to_string())))
            .is_ok()
    }

    /// Leave the room of `match_id` and drop the match-scoped listeners.
    pub fn leave_match(&self, match_id: &str) -> bool {
        let mut link = self.inner.lock();
        let Some(commands) = link.handle.as_ref().map(|h| h.commands.clone()) else {
            return false;
        };
        link.match_listeners = None;
        link.joined_matches.retain(|m| m != match_id);
        drop(link);
        commands
            .send(Command::Emit(ClientMessage::LeaveMatch(match_id.to_string())))
            .is_ok()
    }

    pub fn join_live_feed(&self) -> bool {
        self.set_live_feed(true)
    }

    pub fn leave_live_feed(&self) -> bool {
        self.set_live_feed(false)
    }

    fn set_live_feed(&self, enrolled: bool) -> bool {
        let mut link = self.inner.lock();
        let Some(commands) = link.handle.as_ref().map(|h| h.commands.clone()) else {
            return false;
        };
        link.live_feed = enrolled;
        drop(link);
        let message = if enrolled {
            ClientMessage::JoinLiveFeed
        } else {
            ClientMessage::LeaveLiveFeed
        };
        commands.send(Command::Emit(message)).is_ok()
    }

    /// Close the connection and forget room memberships. The attempt
    /// counter is kept.
    pub fn disconnect(&self) {
        let handle = self.inner.lock().tear_down();
        if let Some(handle) = handle {
            info!(generation = handle.generation, "closing realtime connection");
            let _ = handle.commands.send(Command::Shutdown);
        }
    }

    pub fn has_handle(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Consecutive failed connection attempts so far.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.inner.lock();
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.socket_url)
            .field("has_handle", &link.handle.is_some())
            .field("connected", &link.connected)
            .field("attempts", &link.attempts)
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a failed attempt. Returns whether the task should try again.
    fn record_connect_error(&self, generation: u64) -> bool {
        let mut link = self.lock();
        if !link.owns(generation) {
            return false;
        }
        link.connected = false;
        link.attempts += 1;
        if link.attempts >= self.max_attempts {
            warn!(
                attempts = link.attempts,
                "realtime connection failed too often, giving up"
            );
            link.tear_down();
            return false;
        }
        debug!(attempts = link.attempts, "connection attempt failed");
        true
    }

    /// Mark the session live and return the room joins to replay, or `None`
    /// when this task has been superseded.
    fn on_connected(&self, generation: u64) -> Option<Vec<ClientMessage>> {
        let mut link = self.lock();
        if !link.owns(generation) {
            return None;
        }
        link.attempts = 0;
        link.connected = true;
        let mut replay = link
            .joined_matches
            .iter()
            .map(|id| ClientMessage::JoinMatch(id.clone()))
            .collect::<Vec<_>>();
        if link.live_feed {
            replay.push(ClientMessage::JoinLiveFeed);
        }
        Some(replay)
    }

    fn on_disconnected(&self, generation: u64) {
        let mut link = self.lock();
        if link.owns(generation) {
            link.connected = false;
        }
    }

    fn dispatch(&self, name: &str, data: Value) {
        let message = match ServerMessage::parse(name, data) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(event = name, "ignoring unhandled event");
                return;
            }
            Err(err) => {
                warn!(error = %err, "dropping malformed push");
                return;
            }
        };
        let kind = message.kind();
        let listening = {
            let link = self.lock();
            if kind.is_global() {
                link.global_listeners
            } else {
                link.match_listeners.is_some()
            }
        };
        if !listening {
            debug!(event = %kind, "no listener registered");
            return;
        }
        self.apply(message);
    }

    fn apply(&self, message: ServerMessage) {
        match message {
            ServerMessage::GlobalEvent(payload) => {
                self.store.update_match_from_socket(&payload.patch);
                self.announce(&payload);
            }
            ServerMessage::MatchStarted(patch) | ServerMessage::MatchEnded(patch) => {
                self.store.update_match_from_socket(&patch);
            }
            ServerMessage::EventAdded(event) => self.store.add_event_to_match(*event),
            ServerMessage::EventDeleted(deleted) => self
                .store
                .remove_event_from_match(&deleted.match_id, &deleted.event_id),
            ServerMessage::Status(update) => self.store.update_match_from_socket(
                &MatchPatch::new(update.match_id).with_status(update.status),
            ),
            ServerMessage::Minute(update) => self.store.update_match_from_socket(
                &MatchPatch::new(update.match_id).with_minute(update.minute),
            ),
        }
    }

    /// Turn a headline event (goal, red card) into a live banner request.
    fn announce(&self, payload: &GlobalEventPayload) {
        let (Some(banner), Some(event)) = (&self.banner, &payload.event) else {
            return;
        };
        if !event.event_type.is_headline() {
            return;
        }
        let known = self.store.find_match(&payload.patch.id);
        let home = payload
            .home_team
            .clone()
            .or_else(|| known.as_ref().map(|m| m.home_team.clone()));
        let away = payload
            .away_team
            .clone()
            .or_else(|| known.as_ref().map(|m| m.away_team.clone()));
        let (Some(home), Some(away)) = (home, away) else {
            debug!(match_id = %payload.patch.id, "unknown teams, skipping banner");
            return;
        };

        let title = match event.event_type {
            t if t.is_goal() => "Goal!",
            MatchEventType::RedCard | MatchEventType::SecondYellow => "Red card",
            _ => "Match update",
        };
        let subtitle = event
            .player
            .as_ref()
            .map(|p| format!("{} {}", p.name, event.minute_label()));
        let home_score = payload
            .patch
            .home_score
            .or_else(|| known.as_ref().map(|m| m.home_score))
            .unwrap_or_default();
        let away_score = payload
            .patch
            .away_score
            .or_else(|| known.as_ref().map(|m| m.away_score))
            .unwrap_or_default();

        banner.show(LiveBannerData {
            match_id: payload.patch.id.clone(),
            event_type: event.event_type,
            title: title.to_string(),
            subtitle,
            home_team_name: home.name,
            away_team_name: away.name,
            home_team_logo: home.logo_url,
            away_team_logo: away.logo_url,
            home_score,
            away_score,
            minute: Some(event.minute),
        });
    }
}

/// Socket task: connect, run the session, reconnect after the delay until
/// shut down or out of attempts.
async fn run_socket(
    inner: Arc<Inner>,
    generation: u64,
    token: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        match run_session(&inner, generation, &token, &mut commands).await {
            Ok(SessionEnd::Shutdown) => {
                debug!(generation, "socket task shut down");
                return;
            }
            Ok(SessionEnd::Closed) => {
                info!(generation, "realtime connection lost, reconnecting");
                inner.on_disconnected(generation);
            }
            Err(err) => {
                warn!(generation, error = %err, "realtime connection attempt failed");
                if !inner.record_connect_error(generation) {
                    return;
                }
            }
        }

        // Outbound messages queued while offline are dropped; rooms are
        // replayed from the shared state once the next session is up.
        let wake = Instant::now() + inner.reconnection_delay;
        loop {
            tokio::select! {
                _ = sleep_until(wake) => break,
                command = commands.recv() => match command {
                    Some(Command::Emit(_)) => continue,
                    Some(Command::Shutdown) | None => return,
                },
            }
        }
    }
}

async fn run_session(
    inner: &Inner,
    generation: u64,
    token: &str,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> Result<SessionEnd> {
    let endpoint = format!("{}{}", inner.socket_url, ENGINE_IO_PATH);
    debug!(endpoint = %endpoint, "opening websocket");
    let (ws, _) = timeout(HANDSHAKE_TIMEOUT, connect_async(endpoint.as_str()))
        .await
        .map_err(|_| LiveScoreError::Protocol("websocket handshake timed out".to_string()))??;
    let (mut sink, mut source) = ws.split();

    let info = match next_packet(&mut source).await? {
        Packet::Open(info) => info,
        other => {
            return Err(LiveScoreError::Protocol(format!(
                "expected open packet, got {other:?}"
            )))
        }
    };
    debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine.io session opened");

    send(&mut sink, Packet::Connect(Some(json!({ "token": token })))).await?;
    loop {
        match next_packet(&mut source).await? {
            Packet::Connect(_) => break,
            Packet::Ping => send(&mut sink, Packet::Pong).await?,
            Packet::ConnectError(data) => {
                let reason = data
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string());
                return Err(LiveScoreError::ConnectRejected(reason));
            }
            other => debug!(packet = ?other, "ignoring packet before connect"),
        }
    }

    loop {
        match commands.try_recv() {
            Ok(Command::Emit(_)) => continue,
            Ok(Command::Shutdown) => return Ok(SessionEnd::Shutdown),
            Err(_) => break,
        }
    }
    let Some(replay) = inner.on_connected(generation) else {
        return Ok(SessionEnd::Shutdown);
    };
    info!(generation, rooms = replay.len(), "realtime connected");
    for message in replay {
        emit(&mut sink, &message).await?;
    }

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => match Packet::decode(text.as_str()) {
                    Ok(Packet::Ping) => {
                        if send(&mut sink, Packet::Pong).await.is_err() {
                            return Ok(SessionEnd::Closed);
                        }
                    }
                    Ok(Packet::Event { name, data }) => inner.dispatch(&name, data),
                    Ok(Packet::Disconnect) | Ok(Packet::Close) => return Ok(SessionEnd::Closed),
                    Ok(other) => debug!(packet = ?other, "ignoring packet"),
                    Err(err) => warn!(error = %err, "undecodable frame"),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    return Ok(SessionEnd::Closed);
                }
            },
            command = commands.recv() => match command {
                Some(Command::Emit(message)) => {
                    if let Err(err) = emit(&mut sink, &message).await {
                        warn!(error = %err, "websocket write failed");
                        return Ok(SessionEnd::Closed);
                    }
                }
                Some(Command::Shutdown) | None => {
                    let _ = send(&mut sink, Packet::Disconnect).await;
                    let _ = sink.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
            },
        }
    }
}

async fn next_packet(source: &mut WsSource) -> Result<Packet> {
    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    loop {
        let frame = timeout_at(deadline, source.next())
            .await
            .map_err(|_| LiveScoreError::Protocol("handshake timed out".to_string()))?;
        match frame {
            Some(Ok(Message::Text(text))) => return Packet::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                return Err(LiveScoreError::Protocol(
                    "connection closed during handshake".to_string(),
                ))
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => return Err(err.into()),
        }
    }
}

async fn send(sink: &mut WsSink, packet: Packet) -> Result<()> {
    sink.send(Message::text(packet.encode())).await?;
    Ok(())
}

async fn emit(sink: &mut WsSink, message: &ClientMessage) -> Result<()> {
    debug!(event = message.name(), "emitting");
    send(sink, Packet::event(message.name(), message.payload())).await
}
