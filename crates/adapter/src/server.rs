//! TCP server for the control adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use anyhow::Context;
use serde::Serialize;

use crate::core::SessionSnapshot;
use crate::protocol::*;
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage};
use crate::types::SessionState;

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    /// Append every inbound and outbound line to this file
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            protocol_version: "1.0.0".to_string(),
            max_pending_commands: 10,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from `GHOST_TETRIS_*` environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("GHOST_TETRIS_HOST").unwrap_or(defaults.host);
        let port = env::var("GHOST_TETRIS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let max_pending_commands = env::var("GHOST_TETRIS_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        let log_path = env::var("GHOST_TETRIS_WIRE_LOG")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid adapter address {}:{}", self.host, self.port))
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("GHOST_TETRIS_ADAPTER_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<u64>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: u64,
    pub addr: SocketAddr,
    pub is_controller: bool,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Line(String),
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
}

/// Why a message was refused before reaching the game loop
enum Admission {
    Admitted,
    HandshakeRequired,
    OutOfOrder,
}

async fn is_handshaken(state: &ServerState, client_id: u64) -> bool {
    let clients = state.clients.read().await;
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(|c| c.handshaken)
        .unwrap_or(false)
}

async fn check_and_update_seq(state: &ServerState, client_id: u64, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        Some(prev) if seq <= prev => false,
        _ => {
            client.last_seq = Some(seq);
            true
        }
    }
}

/// Handshake plus strictly increasing `seq`, shared by command and control
async fn admit(state: &ServerState, client_id: u64, seq: u64) -> Admission {
    if !is_handshaken(state, client_id).await {
        return Admission::HandshakeRequired;
    }
    if !check_and_update_seq(state, client_id, seq).await {
        return Admission::OutOfOrder;
    }
    Admission::Admitted
}

/// Send the matching error for a refused message; true when admitted
fn report_admission(
    admission: Admission,
    seq: u64,
    what: &str,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
) -> bool {
    let error = match admission {
        Admission::Admitted => return true,
        Admission::HandshakeRequired => create_error(
            seq,
            ErrorCode::HandshakeRequired,
            &format!("Send hello before {}", what),
        ),
        Admission::OutOfOrder => create_error(
            seq,
            ErrorCode::InvalidCommand,
            "seq must be strictly increasing",
        ),
    };
    let _ = tx.send(ClientOutbound::Error(error));
    false
}

fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                log::warn!("wire log {} unavailable: {}", path, e);
                return;
            }
        };

        while let Some(mut bytes) = rx.recv().await {
            bytes.push(b'\n');
            if file.write_all(&bytes).await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

/// Start the TCP server
///
/// Sends the bound address through `ready_tx` once listening, so callers can
/// bind port 0 and learn the real port.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind adapter on {}", addr))?;
    let bound = listener.local_addr()?;
    log::info!("adapter listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));
    let mut client_id_counter = 0u64;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Line(line));
                        }
                    }
                    OutboundMessage::Broadcast { line } => {
                        for c in clients.iter().filter(|c| c.stream_observations) {
                            let _ = c.tx.send(ClientOutbound::Line(line.clone()));
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        log::info!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            let result =
                handle_client(socket, addr, client_id, state, command_tx, wire_log_tx).await;
            if let Err(e) = result {
                log::warn!("client {} error: {}", client_id, e);
            }
            log::info!("client {} disconnected", client_id);
        });
    }
}

fn encode<T: Serialize>(buf: &mut Vec<u8>, msg: &T) -> bool {
    buf.clear();
    serde_json::to_writer(&mut *buf, msg).is_ok()
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: u64,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            addr,
            is_controller: false,
            stream_observations: false,
            handshaken: false,
            last_seq: None,
            tx: tx.clone(),
        });
    }

    let wire_log_out = wire_log_tx.clone();

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            let ok = match &msg {
                ClientOutbound::Line(line) => {
                    buf.clear();
                    buf.extend_from_slice(line.as_bytes());
                    true
                }
                ClientOutbound::Ack(ack) => encode(&mut buf, ack),
                ClientOutbound::Error(err) => encode(&mut buf, err),
                ClientOutbound::Welcome(welcome) => encode(&mut buf, welcome),
            };
            if !ok {
                continue;
            }
            if let Some(log_tx) = wire_log_out.as_ref() {
                let _ = log_tx.send(buf.clone());
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(log_tx) = wire_log_tx.as_ref() {
            let _ = log_tx.send(trimmed.as_bytes().to_vec());
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, hello.seq).await
                {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                let major = state.config.protocol_version.split('.').next().unwrap_or("1");
                if hello.protocol_version.split('.').next() != Some(major) {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    break;
                }

                // First client to hello becomes controller.
                let (role, controller_id) = {
                    let mut controller = state.controller.write().await;
                    let mut clients = state.clients.write().await;
                    let promote = controller.is_none();
                    if promote {
                        *controller = Some(client_id);
                        log::info!("client {} is now controller", client_id);
                    }
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.stream_observations = hello.requested.stream_observations;
                        client.is_controller |= promote;
                    }
                    let role = if *controller == Some(client_id) {
                        AssignedRole::Controller
                    } else {
                        AssignedRole::Observer
                    };
                    (role, *controller)
                };

                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id,
                    role,
                    controller_id,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                let admission = admit(&state, client_id, cmd.seq).await;
                if !report_admission(admission, cmd.seq, "command", &tx) {
                    continue;
                }

                if *state.controller.read().await != Some(client_id) {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::NotController,
                        "Only controller may send commands",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                let commands = match resolve_commands(&cmd) {
                    Ok(c) => c,
                    Err(message) => {
                        let error = create_error(cmd.seq, ErrorCode::InvalidCommand, &message);
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }
                };

                // Ack is sent by the game loop after the commands are applied.
                if command_tx
                    .try_send(InboundCommand {
                        client_id,
                        seq: cmd.seq,
                        payload: InboundPayload::Commands(commands),
                    })
                    .is_err()
                {
                    log::debug!("client {} command {} dropped: queue full", client_id, cmd.seq);
                    let error =
                        create_error(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                    let _ = tx.send(ClientOutbound::Error(error));
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                let admission = admit(&state, client_id, ctrl.seq).await;
                if !report_admission(admission, ctrl.seq, "control", &tx) {
                    continue;
                }

                let mut controller = state.controller.write().await;
                let mut clients = state.clients.write().await;
                let reply = match ctrl.action {
                    ControlAction::Claim if controller.is_none() => {
                        *controller = Some(client_id);
                        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                            client.is_controller = true;
                        }
                        log::info!("client {} claimed control", client_id);
                        ClientOutbound::Ack(create_ack(ctrl.seq, &[]))
                    }
                    ControlAction::Claim if *controller == Some(client_id) => {
                        ClientOutbound::Ack(create_ack(ctrl.seq, &[]))
                    }
                    ControlAction::Claim => ClientOutbound::Error(create_error(
                        ctrl.seq,
                        ErrorCode::ControllerActive,
                        "Controller already assigned",
                    )),
                    ControlAction::Release if *controller == Some(client_id) => {
                        *controller = None;
                        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                            client.is_controller = false;
                        }
                        log::info!("client {} released control", client_id);
                        ClientOutbound::Ack(create_ack(ctrl.seq, &[]))
                    }
                    ControlAction::Release => ClientOutbound::Error(create_error(
                        ctrl.seq,
                        ErrorCode::NotController,
                        "Only controller may release",
                    )),
                };
                let _ = tx.send(reply);
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, unknown.seq).await
                {
                    let error = create_error(
                        unknown.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }
                let error =
                    create_error(unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
                let _ = tx.send(ClientOutbound::Error(error));
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                let error = create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                );
                let _ = tx.send(ClientOutbound::Error(error));
            }
        }
    }

    // Remove the client and promote the lowest remaining id if it held control.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;

        let was_controller = *controller == Some(client_id);
        clients.retain(|c| c.id != client_id);

        if was_controller {
            let next_id = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
            *controller = next_id;
            match next_id {
                Some(new_id) => {
                    if let Some(c) = clients.iter_mut().find(|c| c.id == new_id) {
                        c.is_controller = true;
                    }
                    log::info!("client {} promoted to controller", new_id);
                }
                None => log::info!("controller {} released", client_id),
            }
        }
    }

    drop(tx);
    let _ = write_task.await;

    Ok(())
}

/// Build an observation message from a session snapshot
pub fn build_observation(snapshot: &SessionSnapshot, seq: u64) -> ObservationMessage {
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        state: match snapshot.state {
            SessionState::Idle => StateName::Idle,
            SessionState::Playing => StateName::Playing,
            SessionState::Paused => StateName::Paused,
            SessionState::GameOver => StateName::GameOver,
        },
        playable: snapshot.playable(),
        paused: snapshot.state == SessionState::Paused,
        game_over: snapshot.state == SessionState::GameOver,
        episode_id: snapshot.episode_id,
        seed: snapshot.seed,
        board: BoardSnapshot {
            width: snapshot.width() as u8,
            height: snapshot.height() as u8,
            cells: snapshot.grid.clone(),
        },
        active: snapshot
            .active
            .map(|a| ActivePieceSnapshot::new(a.kind, a.x, a.y, &a.matrix)),
        ghost_y: snapshot.ghost_y,
        next: snapshot.next.into(),
        hold: snapshot.hold.map(PieceKindLower::from),
        can_hold: snapshot.can_hold,
        state_hash: state_hash(snapshot),
        score: snapshot.score,
        level: snapshot.level,
        lines: snapshot.lines,
        difficulty: snapshot.difficulty,
        fall_interval_ms: snapshot.fall_interval_ms,
        stats: StatsSnapshot {
            pieces_placed: snapshot.stats.pieces_placed,
            singles: snapshot.stats.singles,
            doubles: snapshot.stats.doubles,
            triples: snapshot.stats.triples,
            tetrises: snapshot.stats.tetrises,
        },
    }
}

/// FNV-1a hash over everything that affects play
pub fn state_hash(snapshot: &SessionSnapshot) -> StateHash {
    use std::hash::{Hash, Hasher};

    let mut hasher = Fnv1aHasher::new();
    snapshot.grid.hash(&mut hasher);
    snapshot.active.hash(&mut hasher);
    snapshot.next.hash(&mut hasher);
    snapshot.hold.hash(&mut hasher);
    snapshot.can_hold.hash(&mut hasher);
    snapshot.state.hash(&mut hasher);
    snapshot.difficulty.hash(&mut hasher);
    snapshot.score.hash(&mut hasher);
    snapshot.level.hash(&mut hasher);
    snapshot.lines.hash(&mut hasher);
    snapshot.episode_id.hash(&mut hasher);
    snapshot.seed.hash(&mut hasher);
    StateHash(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Session, SessionConfig};
    use crate::types::{Command, Difficulty};

    fn started() -> Session {
        let mut session = Session::new(SessionConfig::with_seed(7));
        session.apply(Command::Start {
            name: "ada".to_string(),
            difficulty: Difficulty::Standard,
        });
        session
    }

    #[test]
    fn test_extract_seq_best_effort() {
        assert_eq!(extract_seq_best_effort(r#"{"seq": 42, "type":"#), Some(42));
        assert_eq!(extract_seq_best_effort(r#"{"seq":"x"}"#), None);
        assert_eq!(extract_seq_best_effort("garbage"), None);
    }

    #[test]
    fn test_server_config_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 7777);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_observation_mirrors_snapshot() {
        let session = started();
        let snapshot = session.snapshot();
        let obs = build_observation(&snapshot, 3);

        assert_eq!(obs.seq, 3);
        assert_eq!(obs.state, StateName::Playing);
        assert!(obs.playable);
        assert_eq!(obs.board.width, 12);
        assert_eq!(obs.board.height, 20);
        assert_eq!(obs.board.cells.len(), 20);
        assert!(obs.active.is_some());
        assert_eq!(obs.fall_interval_ms, 800);
    }

    #[test]
    fn test_state_hash_stable_and_sensitive() {
        let mut session = started();
        let before = state_hash(&session.snapshot());
        assert_eq!(before, state_hash(&session.snapshot()));

        session.apply(Command::Hold);
        assert_ne!(before, state_hash(&session.snapshot()));
    }
}
