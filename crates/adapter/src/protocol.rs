//! Protocol module - JSON message types for the control adapter
//!
//! Every message is one JSON object per line with a `type`, a `seq` and a
//! millisecond `ts`. Server-to-client messages are built from session
//! snapshots and events; client-to-server messages map onto [`Command`]s.

use serde::{Deserialize, Serialize};

use crate::core::{GameEvent, Matrix, ScoreRecord};
use crate::types::{ClearSize, Command, Difficulty, Outcome, PieceKind};

use arrayvec::ArrayVec;

/// Most commands accepted in one `command` message
pub const MAX_COMMANDS_PER_MESSAGE: usize = 32;

// ============== Client -> Game Messages ==============

/// Client hello message (first message to establish connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(default)]
    pub stream_observations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignedRole {
    #[serde(rename = "controller")]
    Controller,
    #[serde(rename = "observer")]
    Observer,
}

/// Command message (controller only)
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub commands: CommandList,
    /// Player name for `start`
    #[serde(default)]
    pub name: Option<String>,
    /// Difficulty for `start`
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Wire name of a command; `start` takes its arguments from the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Hold,
    Pause,
    Resume,
    TogglePause,
    Start,
    Restart,
    End,
}

impl CommandName {
    /// Parse a command name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("start") {
            return Some(Self::Start);
        }
        Some(match Command::from_str(s)? {
            Command::MoveLeft => Self::MoveLeft,
            Command::MoveRight => Self::MoveRight,
            Command::RotateCw => Self::RotateCw,
            Command::RotateCcw => Self::RotateCcw,
            Command::SoftDrop => Self::SoftDrop,
            Command::HardDrop => Self::HardDrop,
            Command::Hold => Self::Hold,
            Command::Pause => Self::Pause,
            Command::Resume => Self::Resume,
            Command::TogglePause => Self::TogglePause,
            Command::Restart => Self::Restart,
            Command::End => Self::End,
            Command::Start { .. } => Self::Start,
        })
    }
}

impl<'de> Deserialize<'de> for CommandName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom("unknown command"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList(pub ArrayVec<CommandName, MAX_COMMANDS_PER_MESSAGE>);

impl<'de> Deserialize<'de> for CommandList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = CommandList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of command strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<CommandName, MAX_COMMANDS_PER_MESSAGE>::new();
                while let Some(c) = seq.next_element::<CommandName>()? {
                    out.try_push(c)
                        .map_err(|_| serde::de::Error::custom("too many commands"))?;
                }
                Ok(CommandList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Claim,
    Release,
}

impl<'de> Deserialize<'de> for ControlAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("claim") {
            Ok(Self::Claim)
        } else if s.eq_ignore_ascii_case("release") {
            Ok(Self::Release)
        } else {
            Err(serde::de::Error::custom("invalid control action"))
        }
    }
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "not_controller")]
    NotController,
    #[serde(rename = "controller_active")]
    ControllerActive,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "backpressure")]
    Backpressure,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: [CapabilityFormat; 1],
    pub commands: Vec<String>,
    pub features: Vec<CapabilityFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFormat {
    #[serde(rename = "json")]
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFeature {
    #[serde(rename = "hold")]
    Hold,
    #[serde(rename = "next")]
    Next,
    #[serde(rename = "can_hold")]
    CanHold,
    #[serde(rename = "ghost_y")]
    GhostY,
    #[serde(rename = "state_hash")]
    StateHash,
    #[serde(rename = "score")]
    Score,
    #[serde(rename = "stats")]
    Stats,
    #[serde(rename = "events")]
    Events,
}

/// Outcome of one applied command, as sent in acks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeName {
    Ignored,
    Rejected,
    Moved,
    Rotated,
    Held,
    Locked,
    Started,
    Paused,
    Resumed,
    GameOver,
}

impl From<Outcome> for OutcomeName {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Ignored => Self::Ignored,
            Outcome::Rejected => Self::Rejected,
            Outcome::Moved => Self::Moved,
            Outcome::Rotated => Self::Rotated,
            Outcome::Held => Self::Held,
            Outcome::Locked { .. } => Self::Locked,
            Outcome::Started => Self::Started,
            Outcome::Paused => Self::Paused,
            Outcome::Resumed => Self::Resumed,
            Outcome::GameOver => Self::GameOver,
        }
    }
}

/// Acknowledgment for an applied command message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
    /// One entry per command, in order
    #[serde(default)]
    pub outcomes: Vec<OutcomeName>,
    /// Rows cleared across the whole message
    #[serde(default)]
    pub lines_cleared: u32,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Game state observation (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub state: StateName,
    pub playable: bool,
    pub paused: bool,
    pub game_over: bool,
    pub episode_id: u32,
    pub seed: u64,
    pub board: BoardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActivePieceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost_y: Option<i8>,
    pub next: PieceKindLower,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<PieceKindLower>,
    pub can_hold: bool,
    pub state_hash: StateHash,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub difficulty: Difficulty,
    pub fall_interval_ms: u32,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateName {
    Idle,
    Playing,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub width: u8,
    pub height: u8,
    /// Row-major piece ids, 0 = empty
    pub cells: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePieceSnapshot {
    pub kind: PieceKindLower,
    pub x: i8,
    pub y: i8,
    pub matrix: Vec<Vec<u8>>,
}

impl ActivePieceSnapshot {
    pub fn new(kind: PieceKind, x: i8, y: i8, matrix: &Matrix) -> Self {
        Self {
            kind: kind.into(),
            x,
            y,
            matrix: matrix.id_rows(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub pieces_placed: u32,
    pub singles: u32,
    pub doubles: u32,
    pub triples: u32,
    pub tetrises: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKindLower {
    #[serde(rename = "t")]
    T,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "l")]
    L,
    #[serde(rename = "j")]
    J,
    #[serde(rename = "i")]
    I,
    #[serde(rename = "s")]
    S,
    #[serde(rename = "z")]
    Z,
}

impl From<PieceKind> for PieceKindLower {
    fn from(value: PieceKind) -> Self {
        match value {
            PieceKind::T => Self::T,
            PieceKind::O => Self::O,
            PieceKind::L => Self::L,
            PieceKind::J => Self::J,
            PieceKind::I => Self::I,
            PieceKind::S => Self::S,
            PieceKind::Z => Self::Z,
        }
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for i in 0..16 {
            buf[15 - i] = HEX[(v & 0x0f) as usize];
            v >>= 4;
        }
        let s = std::str::from_utf8(&buf).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid hex"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "event")]
    Event,
}

/// Session event forwarded to streaming clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: EventType,
    pub seq: u64,
    pub ts: u64,
    pub event: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    PieceLocked {
        piece: PieceKindLower,
        x: i8,
        y: i8,
    },
    LinesCleared {
        rows: Vec<usize>,
        size: ClearSizeName,
    },
    LevelUp {
        level: u32,
    },
    GameOver,
    ScoreRecorded {
        #[serde(flatten)]
        record: ScoreRecord,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearSizeName {
    Single,
    Double,
    Triple,
    Tetris,
}

impl From<ClearSize> for ClearSizeName {
    fn from(value: ClearSize) -> Self {
        match value {
            ClearSize::Single => Self::Single,
            ClearSize::Double => Self::Double,
            ClearSize::Triple => Self::Triple,
            ClearSize::Tetris => Self::Tetris,
        }
    }
}

impl From<&GameEvent> for EventPayload {
    fn from(value: &GameEvent) -> Self {
        match value {
            GameEvent::PieceLocked { kind, x, y } => Self::PieceLocked {
                piece: (*kind).into(),
                x: *x,
                y: *y,
            },
            GameEvent::LinesCleared { rows, size } => Self::LinesCleared {
                rows: rows.to_vec(),
                size: (*size).into(),
            },
            GameEvent::LevelUp { level } => Self::LevelUp { level: *level },
            GameEvent::GameOver => Self::GameOver,
            GameEvent::ScoreRecorded(record) => Self::ScoreRecorded {
                record: record.clone(),
            },
        }
    }
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct TypeAndSeq<'a> {
                #[serde(rename = "type")]
                msg_type: Option<&'a str>,
                seq: Option<u64>,
            }
            let probe = serde_json::from_str::<TypeAndSeq>(json)?;
            match probe.msg_type.unwrap_or("unknown") {
                "hello" | "command" | "control" => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: probe.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Resolve a command message into session commands
///
/// `start` needs a non-empty `name`; its difficulty defaults to standard.
pub fn resolve_commands(cmd: &CommandMessage) -> Result<Vec<Command>, String> {
    cmd.commands
        .0
        .iter()
        .map(|name| match name {
            CommandName::MoveLeft => Ok(Command::MoveLeft),
            CommandName::MoveRight => Ok(Command::MoveRight),
            CommandName::RotateCw => Ok(Command::RotateCw),
            CommandName::RotateCcw => Ok(Command::RotateCcw),
            CommandName::SoftDrop => Ok(Command::SoftDrop),
            CommandName::HardDrop => Ok(Command::HardDrop),
            CommandName::Hold => Ok(Command::Hold),
            CommandName::Pause => Ok(Command::Pause),
            CommandName::Resume => Ok(Command::Resume),
            CommandName::TogglePause => Ok(Command::TogglePause),
            CommandName::Restart => Ok(Command::Restart),
            CommandName::End => Ok(Command::End),
            CommandName::Start => {
                let name = cmd.name.as_deref().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err("start requires a player name".to_string());
                }
                Ok(Command::Start {
                    name: name.to_string(),
                    difficulty: cmd.difficulty.unwrap_or_default(),
                })
            }
        })
        .collect()
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        requested: RequestedCapabilities {
            stream_observations: true,
        },
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        role,
        controller_id,
        game_id: "ghost-tetris".to_string(),
        capabilities: ServerCapabilities {
            formats: [CapabilityFormat::Json],
            commands: [
                "moveLeft",
                "moveRight",
                "rotateCw",
                "rotateCcw",
                "softDrop",
                "hardDrop",
                "hold",
                "pause",
                "resume",
                "togglePause",
                "start",
                "restart",
                "end",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            features: vec![
                CapabilityFeature::Hold,
                CapabilityFeature::Next,
                CapabilityFeature::CanHold,
                CapabilityFeature::GhostY,
                CapabilityFeature::StateHash,
                CapabilityFeature::Score,
                CapabilityFeature::Stats,
                CapabilityFeature::Events,
            ],
        },
    }
}

/// Create an acknowledgment carrying the per-command outcomes
pub fn create_ack(seq: u64, outcomes: &[Outcome]) -> AckMessage {
    let lines_cleared = outcomes
        .iter()
        .map(|o| match o {
            Outcome::Locked { lines } => *lines as u32,
            _ => 0,
        })
        .sum();
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
        outcomes: outcomes.iter().copied().map(OutcomeName::from).collect(),
        lines_cleared,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Create an event message
pub fn create_event(seq: u64, event: &GameEvent) -> EventMessage {
    EventMessage {
        msg_type: EventType::Event,
        seq,
        ts: current_timestamp_ms(),
        event: event.into(),
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
