//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the game rules and session state. It does no I/O and
//! has no knowledge of rendering, audio or input devices, which makes it:
//!
//! - **Deterministic**: the same seed produces the same piece sequence
//! - **Testable**: every rule is exercised by unit tests next to the code
//! - **Portable**: runs headless, behind a TCP adapter, or under any UI
//!
//! # Module Structure
//!
//! - [`catalog`]: the seven shape matrices and matrix rotation
//! - [`board`]: 12x20 grid with collision detection, merging and row clearing
//! - [`active`]: the falling piece, spawn, drops and kick search
//! - [`hold`]: once-per-spawn hold slot
//! - [`queue`]: single-slot next piece generator (uniform or 7-bag)
//! - [`scoring`]: line clear points, levels and fall intervals
//! - [`session`]: the Idle/Playing/Paused/GameOver state machine
//! - [`snapshot`]: read-only render view of a session
//! - [`leaderboard`]: ranked local score records
//!
//! # Game Rules
//!
//! - **Spawn**: row 0, centered; a blocked spawn ends the game and wipes the grid
//! - **Rotation**: matrix transpose plus row/column reversal, with sideways kicks
//!   of +1, -1, +2, -2, ... columns
//! - **Drop**: automatic when the accumulated time exceeds the fall interval
//! - **Hold**: once per spawned piece
//! - **Scoring**: `(2^n - 1) * 10 * level` for `n` rows in one lock
//! - **Levels**: one per 10 lines, each 50ms faster down to a 100ms floor
//!
//! # Example
//!
//! ```
//! use ghost_tetris_core::{Session, SessionConfig};
//! use ghost_tetris_types::{Command, Difficulty, Outcome, SessionState};
//!
//! let mut session = Session::new(SessionConfig::with_seed(12345));
//! let outcome = session.apply(Command::Start {
//!     name: "ada".to_string(),
//!     difficulty: Difficulty::Standard,
//! });
//! assert_eq!(outcome, Outcome::Started);
//!
//! session.apply(Command::MoveRight);
//! session.apply(Command::RotateCw);
//! assert!(matches!(session.apply(Command::HardDrop), Outcome::Locked { .. }));
//! assert_eq!(session.state(), SessionState::Playing);
//! ```
//!
//! # Timing
//!
//! Call [`Session::tick`](session::Session::tick) every frame with the
//! elapsed milliseconds. The reference loop uses a 16ms fixed step.

pub mod active;
pub mod board;
pub mod catalog;
pub mod hold;
pub mod leaderboard;
pub mod queue;
pub mod scoring;
pub mod session;
pub mod snapshot;

pub use ghost_tetris_types as types;

// Re-export commonly used types for convenience
pub use active::{try_rotate, ActivePiece, DropResult};
pub use board::{Board, ClearedRows};
pub use catalog::{shape_for, shape_for_id, Matrix};
pub use hold::{HoldExchange, HoldSlot};
pub use leaderboard::{Leaderboard, ScoreRecord};
pub use queue::{NextQueue, Randomizer};
pub use scoring::{calculate_level, fall_interval_ms, line_clear_score, ClearTally, ScoreKeeper};
pub use session::{GameEvent, Session, SessionConfig};
pub use snapshot::{ActiveSnapshot, SessionSnapshot};
