//! Board module - manages the game grid
//!
//! The board is a `width x height` grid (12x20 by default) where each cell is
//! empty or holds the kind of the piece that was locked there.
//! Cells live in one flat row-major buffer allocated once per board.
//! Coordinates: (x, y) with x growing left to right and y growing top to bottom.
//! Rows above the top edge (y < 0) are open space so pieces can spawn partially hidden.

use arrayvec::ArrayVec;

use crate::catalog::Matrix;
use crate::types::{Cell, BOARD_HEIGHT, BOARD_WIDTH, MAX_CLEARED_ROWS};

/// Indices of completed rows, bottom to top
pub type ClearedRows = ArrayVec<usize, MAX_CLEARED_ROWS>;

/// The game board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: u8,
    height: u8,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<Cell>,
}

impl Board {
    /// Create a new empty board with the reference 12x20 size
    pub fn new() -> Self {
        Self::with_size(BOARD_WIDTH, BOARD_HEIGHT)
    }

    /// Create a new empty board of the given size
    ///
    /// Each dimension is clamped to `1..=127` so coordinates fit in `i8`.
    pub fn with_size(width: u8, height: u8) -> Self {
        let width = width.clamp(1, i8::MAX as u8);
        let height = height.clamp(1, i8::MAX as u8);
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.width as i32 || y < 0 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        self.index(x as i32, y as i32).map(|idx| self.cells[idx])
    }

    /// Cell contents, treating out-of-bounds positions as empty
    pub fn cell(&self, x: i8, y: i8) -> Cell {
        self.get(x, y).flatten()
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match self.index(x as i32, y as i32) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Whether `matrix` placed with its origin at (x, y) overlaps a wall, the
    /// floor, or a filled cell
    ///
    /// Cells above the top edge never collide.
    pub fn collides(&self, matrix: &Matrix, x: i8, y: i8) -> bool {
        matrix.occupied().any(|(mx, my, _)| {
            let gx = x as i32 + mx as i32;
            let gy = y as i32 + my as i32;
            if gx < 0 || gx >= self.width as i32 || gy >= self.height as i32 {
                return true;
            }
            if gy < 0 {
                return false;
            }
            self.cells[gy as usize * self.width as usize + gx as usize].is_some()
        })
    }

    /// Write every filled matrix cell into the grid
    ///
    /// Does not check for collisions; callers verify the placement first.
    /// Cells that fall outside the grid (above the top edge) are dropped.
    pub fn merge(&mut self, matrix: &Matrix, x: i8, y: i8) {
        for (mx, my, kind) in matrix.occupied() {
            if let Some(idx) = self.index(x as i32 + mx as i32, y as i32 + my as i32) {
                self.cells[idx] = Some(kind);
            }
        }
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= self.height as usize {
            return false;
        }
        let width = self.width as usize;
        let start = y * width;
        self.cells[start..start + width].iter().all(|cell| cell.is_some())
    }

    /// Find every complete row, scanning bottom to top
    ///
    /// The grid is left untouched so callers can run an effect before
    /// committing the clear with [`Board::clear_and_compact`].
    pub fn sweep_completed_rows(&self) -> ClearedRows {
        let mut rows = ClearedRows::new();
        for y in (0..self.height as usize).rev() {
            if self.is_row_full(y) && rows.try_push(y).is_err() {
                log::warn!("more than {} complete rows in one sweep", MAX_CLEARED_ROWS);
                break;
            }
        }
        rows
    }

    /// Remove the given rows and insert as many empty rows at the top
    ///
    /// The remaining rows keep their relative order. Uses a two-pointer pass so
    /// several (possibly non-adjacent) rows are removed without index shifting.
    /// Out-of-range indices are ignored.
    pub fn clear_and_compact(&mut self, rows: &[usize]) {
        let width = self.width as usize;
        let mut write_y = self.height as usize;

        // Scan from bottom to top
        for read_y in (0..self.height as usize).rev() {
            if rows.contains(&read_y) {
                continue;
            }
            write_y -= 1;
            if write_y != read_y {
                let src_start = read_y * width;
                self.cells
                    .copy_within(src_start..src_start + width, write_y * width);
            }
        }

        // Clear the remaining rows at the top
        for cell in &mut self.cells[..write_y * width] {
            *cell = None;
        }
    }

    /// Sweep and compact in one step, returning the cleared rows
    pub fn clear_full_rows(&mut self) -> ClearedRows {
        let rows = self.sweep_completed_rows();
        if !rows.is_empty() {
            self.clear_and_compact(&rows);
        }
        rows
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.width as usize)
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Copy the grid as piece ids (0 = empty) into `out`, reusing its rows
    pub fn write_u8_grid(&self, out: &mut Vec<Vec<u8>>) {
        let width = self.width as usize;
        out.resize_with(self.height as usize, Vec::new);
        for (row, chunk) in out.iter_mut().zip(self.cells.chunks(width)) {
            row.clear();
            row.extend(chunk.iter().map(|c| c.map_or(0, |k| k.id())));
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
