//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the engine.
//! Everything here is plain data, usable from the core rules, the adapter
//! protocol, and any presentation layer.
//!
//! # Board Dimensions
//!
//! Reference playfield dimensions:
//!
//! - **Width**: 12 columns (indexed 0-11)
//! - **Height**: 20 rows (indexed 0-19)
//! - **Spawn position**: row 0, horizontally centered (`width/2 - matrix_width/2`)
//!
//! # Timing
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `FALL_INTERVAL_STEP_MS` | 50 | Fall interval reduction per level |
//! | `FALL_INTERVAL_FLOOR_MS` | 100 | Fastest possible fall interval |
//!
//! # Base Fall Intervals by Difficulty
//!
//! | Difficulty | Interval |
//! |------------|----------|
//! | relaxed | 1200ms |
//! | standard | 800ms |
//! | aggressive | 400ms |
//!
//! At level `L` the fall interval is `max(100, base - (L - 1) * 50)`.
//!
//! # Examples
//!
//! ```
//! use ghost_tetris_types::{Difficulty, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_id(5), Some(PieceKind::I));
//! assert_eq!(PieceKind::I.id(), 5);
//! assert_eq!(PieceKind::from_id(9), None);
//!
//! assert_eq!(Difficulty::from_str("normal"), Some(Difficulty::Standard));
//! assert_eq!(Difficulty::Aggressive.base_fall_interval_ms(), 400);
//!
//! assert_eq!(BOARD_WIDTH, 12);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

use serde::{Deserialize, Serialize};

/// Board width in cells (12 columns)
pub const BOARD_WIDTH: u8 = 12;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Lines needed to advance one level
pub const LINES_PER_LEVEL: u32 = 10;

/// Points per row before the level and row multipliers are applied
pub const LINE_CLEAR_BASE_POINTS: u32 = 10;

/// Fall interval reduction per level above 1
pub const FALL_INTERVAL_STEP_MS: u32 = 50;

/// Fastest fall interval reachable through level progression
pub const FALL_INTERVAL_FLOOR_MS: u32 = 100;

/// Largest shape matrix side (the I piece is 4x4)
pub const MAX_MATRIX_SIZE: usize = 4;

/// Most rows a single lock can complete
pub const MAX_CLEARED_ROWS: usize = 4;

/// Number of records kept by the local leaderboard
pub const LEADERBOARD_CAPACITY: usize = 100;


/// The seven piece kinds
///
/// Discriminants are the cell ids written into the grid:
/// T=1, O=2, L=3, J=4, I=5, S=6, Z=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    T = 1,
    O = 2,
    L = 3,
    J = 4,
    I = 5,
    S = 6,
    Z = 7,
}

impl PieceKind {
    /// Every kind, in catalog order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::T,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::I,
    ];

    /// Grid cell id for this kind (1-7)
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a kind by grid cell id
    ///
    /// Returns `None` for 0 (empty) and anything above 7.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(PieceKind::T),
            2 => Some(PieceKind::O),
            3 => Some(PieceKind::L),
            4 => Some(PieceKind::J),
            5 => Some(PieceKind::I),
            6 => Some(PieceKind::S),
            7 => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use ghost_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "t" => Some(PieceKind::T),
            "o" => Some(PieceKind::O),
            "l" => Some(PieceKind::L),
            "j" => Some(PieceKind::J),
            "i" => Some(PieceKind::I),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::T => "t",
            PieceKind::O => "o",
            PieceKind::L => "l",
            PieceKind::J => "j",
            PieceKind::I => "i",
            PieceKind::S => "s",
            PieceKind::Z => "z",
        }
    }
}

/// Session difficulty, selecting the base fall interval
///
/// Chosen once at session start. Only level progression changes the
/// fall speed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "easy")]
    Relaxed,
    #[default]
    #[serde(alias = "normal")]
    Standard,
    #[serde(alias = "hard")]
    Aggressive,
}

impl Difficulty {
    /// Fall interval at level 1, in milliseconds
    pub fn base_fall_interval_ms(self) -> u32 {
        match self {
            Difficulty::Relaxed => 1200,
            Difficulty::Standard => 800,
            Difficulty::Aggressive => 400,
        }
    }

    /// Parse difficulty (case-insensitive)
    ///
    /// Also accepts the `easy`/`normal`/`hard` names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "easy" => Some(Difficulty::Relaxed),
            "standard" | "normal" => Some(Difficulty::Standard),
            "aggressive" | "hard" => Some(Difficulty::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Relaxed => "relaxed",
            Difficulty::Standard => "standard",
            Difficulty::Aggressive => "aggressive",
        }
    }
}

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationDir {
    Clockwise,
    CounterClockwise,
}

/// Lifecycle state of a session
///
/// - **Idle**: nothing started yet
/// - **Playing**: pieces fall and movement commands are accepted
/// - **Paused**: frozen, only resume/toggle/end are accepted
/// - **GameOver**: terminal until the next start/restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    Paused,
    GameOver,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::GameOver => "gameOver",
        }
    }
}

/// Commands accepted by a session
///
/// These come from whatever input layer drives the engine (keyboard,
/// touch, the TCP adapter). Each one produces an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    /// Move down one row, locking if blocked
    SoftDrop,
    /// Drop to the lowest free row and lock
    HardDrop,
    Hold,
    Pause,
    Resume,
    TogglePause,
    /// Begin a new session for a player
    Start {
        name: String,
        difficulty: Difficulty,
    },
    /// Begin a new session with the previous player and difficulty
    Restart,
    /// Give up the current session
    End,
}

impl Command {
    /// Parse a command without arguments (case-insensitive)
    ///
    /// `start` carries a player name and difficulty, so it is not parsed here.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(Command::MoveLeft),
            "moveright" => Some(Command::MoveRight),
            "rotatecw" => Some(Command::RotateCw),
            "rotateccw" => Some(Command::RotateCcw),
            "softdrop" => Some(Command::SoftDrop),
            "harddrop" => Some(Command::HardDrop),
            "hold" => Some(Command::Hold),
            "pause" => Some(Command::Pause),
            "resume" => Some(Command::Resume),
            "togglepause" => Some(Command::TogglePause),
            "restart" => Some(Command::Restart),
            "end" => Some(Command::End),
            _ => None,
        }
    }

    /// Convert to camelCase string for the adapter protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::MoveLeft => "moveLeft",
            Command::MoveRight => "moveRight",
            Command::RotateCw => "rotateCw",
            Command::RotateCcw => "rotateCcw",
            Command::SoftDrop => "softDrop",
            Command::HardDrop => "hardDrop",
            Command::Hold => "hold",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::TogglePause => "togglePause",
            Command::Start { .. } => "start",
            Command::Restart => "restart",
            Command::End => "end",
        }
    }
}

/// Result of applying a command or a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Not valid in the current session state; nothing changed
    Ignored,
    /// Valid, but blocked (collision, hold already used); nothing changed
    Rejected,
    Moved,
    Rotated,
    Held,
    /// The active piece was merged into the grid
    Locked { lines: u8 },
    Started,
    Paused,
    Resumed,
    /// The session ended (spawn blocked or voluntary end)
    GameOver,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ignored => "ignored",
            Outcome::Rejected => "rejected",
            Outcome::Moved => "moved",
            Outcome::Rotated => "rotated",
            Outcome::Held => "held",
            Outcome::Locked { .. } => "locked",
            Outcome::Started => "started",
            Outcome::Paused => "paused",
            Outcome::Resumed => "resumed",
            Outcome::GameOver => "gameOver",
        }
    }
}

/// Size class of a single clear event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearSize {
    Single,
    Double,
    Triple,
    Tetris,
}

impl ClearSize {
    pub fn from_lines(lines: usize) -> Option<Self> {
        match lines {
            1 => Some(ClearSize::Single),
            2 => Some(ClearSize::Double),
            3 => Some(ClearSize::Triple),
            4 => Some(ClearSize::Tetris),
            _ => None,
        }
    }

    pub fn lines(self) -> u8 {
        match self {
            ClearSize::Single => 1,
            ClearSize::Double => 2,
            ClearSize::Triple => 3,
            ClearSize::Tetris => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClearSize::Single => "single",
            ClearSize::Double => "double",
            ClearSize::Triple => "triple",
            ClearSize::Tetris => "tetris",
        }
    }
}

/// A cell on the game board
///
/// - `None`: Empty cell (id 0)
/// - `Some(PieceKind)`: Cell filled by a locked piece of that kind
pub type Cell = Option<PieceKind>;
