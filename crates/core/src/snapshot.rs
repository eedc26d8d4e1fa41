//! Snapshot module - read-only render view of a session, refilled in place each frame

use crate::active::ActivePiece;
use crate::catalog::Matrix;
use crate::scoring::ClearTally;
use crate::types::{Difficulty, PieceKind, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub matrix: Matrix,
    pub x: i8,
    pub y: i8,
}

impl From<ActivePiece> for ActiveSnapshot {
    fn from(value: ActivePiece) -> Self {
        Self {
            kind: value.kind,
            matrix: value.matrix,
            x: value.x,
            y: value.y,
        }
    }
}

/// Read-only view of a session for render layers
///
/// `grid` holds piece ids (0 = empty), one inner vec per row, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub grid: Vec<Vec<u8>>,
    pub active: Option<ActiveSnapshot>,
    pub ghost_y: Option<i8>,
    pub next: PieceKind,
    pub hold: Option<PieceKind>,
    pub can_hold: bool,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub state: SessionState,
    pub difficulty: Difficulty,
    pub fall_interval_ms: u32,
    pub stats: ClearTally,
    pub episode_id: u32,
    pub seed: u64,
}

impl SessionSnapshot {
    pub fn playable(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn width(&self) -> usize {
        self.grid.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.grid.len()
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            grid: Vec::new(),
            active: None,
            ghost_y: None,
            next: PieceKind::T,
            hold: None,
            can_hold: true,
            score: 0,
            level: 1,
            lines: 0,
            state: SessionState::Idle,
            difficulty: Difficulty::default(),
            fall_interval_ms: Difficulty::default().base_fall_interval_ms(),
            stats: ClearTally::default(),
            episode_id: 0,
            seed: 0,
        }
    }
}
