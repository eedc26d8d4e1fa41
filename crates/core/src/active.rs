//! Active piece controller - the falling piece and its movement rules
//!
//! A piece is spawned centered on row 0, shifted and rotated while it falls,
//! and merged into the board when it can no longer move down.

use crate::board::Board;
use crate::catalog::{shape_for, Matrix};
use crate::types::{PieceKind, RotationDir};

/// Result of a one-row drop attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropResult {
    /// The piece moved down one row
    Moved,
    /// The piece was blocked and has been merged into the board
    Locked,
}

/// The falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub matrix: Matrix,
    pub x: i8,
    pub y: i8,
}

/// Spawn column: `floor(width / 2) - floor(matrix_width / 2)`
pub fn spawn_x(board_width: u8, matrix: &Matrix) -> i8 {
    (board_width / 2) as i8 - (matrix.width() / 2) as i8
}

/// Try to rotate `matrix` at (x, y), kicking sideways when blocked
///
/// Kicks move x by +1, -2, +3, -4, ... cumulatively, so the columns tried
/// are x, x+1, x-1, x+2, ... and the search stops once the next offset
/// exceeds the rotated matrix width.
/// Returns the rotated matrix and the kicked column, or None if every
/// placement collides. Nothing is mutated; the caller commits the result.
pub fn try_rotate(
    matrix: &Matrix,
    x: i8,
    y: i8,
    dir: RotationDir,
    collides: impl Fn(&Matrix, i8, i8) -> bool,
) -> Option<(Matrix, i8)> {
    let rotated = matrix.rotated(dir);
    let width = rotated.width() as i8;

    let mut kicked_x = x;
    let mut offset: i8 = 1;
    while collides(&rotated, kicked_x, y) {
        kicked_x += offset;
        offset = -(offset + offset.signum());
        if offset > width {
            return None;
        }
    }

    Some((rotated, kicked_x))
}

impl ActivePiece {
    /// Create a piece at the spawn position without checking for collisions
    pub fn new(kind: PieceKind, board_width: u8) -> Self {
        let matrix = shape_for(kind);
        Self {
            kind,
            x: spawn_x(board_width, &matrix),
            y: 0,
            matrix,
        }
    }

    /// Spawn a piece, or None if the spawn position is already blocked
    pub fn spawn(kind: PieceKind, board: &Board) -> Option<Self> {
        let piece = Self::new(kind, board.width());
        if piece.collides(board) {
            log::warn!(
                "spawn blocked for {} at ({}, {})",
                kind.as_str(),
                piece.x,
                piece.y
            );
            return None;
        }
        Some(piece)
    }

    pub fn collides(&self, board: &Board) -> bool {
        board.collides(&self.matrix, self.x, self.y)
    }

    /// Shift horizontally by `dx`; returns false (and stays put) if blocked
    pub fn shift(&mut self, board: &Board, dx: i8) -> bool {
        if board.collides(&self.matrix, self.x + dx, self.y) {
            return false;
        }
        self.x += dx;
        true
    }

    /// Whether the piece can move one row down
    pub fn can_fall(&self, board: &Board) -> bool {
        !board.collides(&self.matrix, self.x, self.y + 1)
    }

    /// Move down one row, or merge into the board if blocked
    pub fn soft_drop(&mut self, board: &mut Board) -> DropResult {
        if self.can_fall(board) {
            self.y += 1;
            return DropResult::Moved;
        }
        self.lock(board);
        DropResult::Locked
    }

    /// Drop to the lowest free row and merge; returns rows travelled
    pub fn hard_drop(&mut self, board: &mut Board) -> u32 {
        let landing = self.ghost_y(board);
        let distance = (landing - self.y) as u32;
        self.y = landing;
        self.lock(board);
        distance
    }

    /// Rotate with kicks; returns false and leaves the piece untouched if infeasible
    pub fn rotate(&mut self, board: &Board, dir: RotationDir) -> bool {
        match try_rotate(&self.matrix, self.x, self.y, dir, |m, x, y| {
            board.collides(m, x, y)
        }) {
            Some((matrix, x)) => {
                self.matrix = matrix;
                self.x = x;
                true
            }
            None => false,
        }
    }

    /// Row the piece would land on after a hard drop
    pub fn ghost_y(&self, board: &Board) -> i8 {
        let mut y = self.y;
        while !board.collides(&self.matrix, self.x, y + 1) {
            y += 1;
        }
        y
    }

    /// Merge the piece into the board at its current position
    pub fn lock(&self, board: &mut Board) {
        board.merge(&self.matrix, self.x, self.y);
    }
}
