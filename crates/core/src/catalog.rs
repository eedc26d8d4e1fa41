//! Piece catalog - canonical shape matrices and matrix rotation
//!
//! Every kind maps to a small square matrix (2x2, 3x3 or 4x4). Cells hold the
//! kind itself, so a merged piece writes its own id into the grid.
//! Rotations always produce a new matrix; catalog shapes are never mutated.

use crate::types::{Cell, PieceKind, RotationDir, MAX_MATRIX_SIZE};

const T_MASK: &[&[u8]] = &[&[0, 0, 0], &[1, 1, 1], &[0, 1, 0]];
const O_MASK: &[&[u8]] = &[&[1, 1], &[1, 1]];
const L_MASK: &[&[u8]] = &[&[0, 1, 0], &[0, 1, 0], &[0, 1, 1]];
const J_MASK: &[&[u8]] = &[&[0, 1, 0], &[0, 1, 0], &[1, 1, 0]];
const I_MASK: &[&[u8]] = &[&[0, 1, 0, 0], &[0, 1, 0, 0], &[0, 1, 0, 0], &[0, 1, 0, 0]];
const S_MASK: &[&[u8]] = &[&[0, 1, 1], &[1, 1, 0], &[0, 0, 0]];
const Z_MASK: &[&[u8]] = &[&[1, 1, 0], &[0, 1, 1], &[0, 0, 0]];

/// Square shape matrix, stored in a fixed 4x4 buffer
///
/// Only the top-left `size x size` block is meaningful; the rest stays empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Matrix {
    cells: [[Cell; MAX_MATRIX_SIZE]; MAX_MATRIX_SIZE],
    size: u8,
}

impl Matrix {
    fn from_mask(kind: PieceKind, mask: &[&[u8]]) -> Self {
        let mut cells = [[None; MAX_MATRIX_SIZE]; MAX_MATRIX_SIZE];
        for (y, row) in mask.iter().enumerate() {
            for (x, &bit) in row.iter().enumerate() {
                if bit != 0 {
                    cells[y][x] = Some(kind);
                }
            }
        }
        Self {
            cells,
            size: mask.len() as u8,
        }
    }

    /// Side length (the matrix is square, so this is both width and height)
    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn width(&self) -> u8 {
        self.size
    }

    pub fn height(&self) -> u8 {
        self.size
    }

    /// Cell at (col, row), or None when outside the matrix
    pub fn get(&self, col: usize, row: usize) -> Option<Cell> {
        let n = self.size as usize;
        if col >= n || row >= n {
            return None;
        }
        Some(self.cells[row][col])
    }

    /// Non-empty cells as (col, row, kind), row-major
    pub fn occupied(&self) -> impl Iterator<Item = (i8, i8, PieceKind)> + '_ {
        let n = self.size as usize;
        self.cells[..n].iter().enumerate().flat_map(move |(y, row)| {
            row[..n]
                .iter()
                .enumerate()
                .filter_map(move |(x, cell)| cell.map(|kind| (x as i8, y as i8, kind)))
        })
    }

    /// Rotated copy of this matrix
    ///
    /// Transposes, then reverses every row (clockwise) or the row order
    /// (counter-clockwise).
    pub fn rotated(&self, dir: RotationDir) -> Self {
        let n = self.size as usize;
        let mut transposed = [[None; MAX_MATRIX_SIZE]; MAX_MATRIX_SIZE];
        for (y, row) in transposed[..n].iter_mut().enumerate() {
            for (x, cell) in row[..n].iter_mut().enumerate() {
                *cell = self.cells[x][y];
            }
        }

        let mut out = [[None; MAX_MATRIX_SIZE]; MAX_MATRIX_SIZE];
        for y in 0..n {
            for x in 0..n {
                out[y][x] = match dir {
                    RotationDir::Clockwise => transposed[y][n - 1 - x],
                    RotationDir::CounterClockwise => transposed[n - 1 - y][x],
                };
            }
        }

        Self {
            cells: out,
            size: self.size,
        }
    }

    /// Rows as grid ids (0 = empty), trimmed to the matrix size
    pub fn id_rows(&self) -> Vec<Vec<u8>> {
        let n = self.size as usize;
        self.cells[..n]
            .iter()
            .map(|row| row[..n].iter().map(|c| c.map_or(0, PieceKind::id)).collect())
            .collect()
    }
}

/// Canonical (spawn orientation) shape for a piece kind
pub fn shape_for(kind: PieceKind) -> Matrix {
    let mask = match kind {
        PieceKind::T => T_MASK,
        PieceKind::O => O_MASK,
        PieceKind::L => L_MASK,
        PieceKind::J => J_MASK,
        PieceKind::I => I_MASK,
        PieceKind::S => S_MASK,
        PieceKind::Z => Z_MASK,
    };
    Matrix::from_mask(kind, mask)
}

/// Shape for a raw grid id
///
/// Ids outside 1..=7 are a caller bug: they are logged and yield `None`
/// instead of falling back to some default shape.
pub fn shape_for_id(id: u8) -> Option<Matrix> {
    match PieceKind::from_id(id) {
        Some(kind) => Some(shape_for(kind)),
        None => {
            log::error!("catalog lookup for unknown piece id {}", id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_sizes() {
        assert_eq!(shape_for(PieceKind::O).size(), 2);
        assert_eq!(shape_for(PieceKind::I).size(), 4);
        for kind in [PieceKind::T, PieceKind::L, PieceKind::J, PieceKind::S, PieceKind::Z] {
            assert_eq!(shape_for(kind).size(), 3, "{:?}", kind);
        }
    }

    #[test]
    fn test_every_shape_has_four_cells_of_its_own_kind() {
        for kind in PieceKind::ALL {
            let m = shape_for(kind);
            let cells: Vec<_> = m.occupied().collect();
            assert_eq!(cells.len(), 4, "{:?}", kind);
            assert!(cells.iter().all(|&(_, _, k)| k == kind));
        }
    }

    #[test]
    fn test_t_id_rows() {
        assert_eq!(
            shape_for(PieceKind::T).id_rows(),
            vec![vec![0, 0, 0], vec![1, 1, 1], vec![0, 1, 0]]
        );
    }

    #[test]
    fn test_rotate_clockwise() {
        // transpose -> [[0,1,0],[0,1,1],[0,1,0]], reverse rows -> [[0,1,0],[1,1,0],[0,1,0]]
        let r = shape_for(PieceKind::T).rotated(RotationDir::Clockwise);
        assert_eq!(r.id_rows(), vec![vec![0, 1, 0], vec![1, 1, 0], vec![0, 1, 0]]);
    }

    #[test]
    fn test_rotate_counter_clockwise() {
        // transpose -> [[0,1,0],[0,1,1],[0,1,0]], reverse order -> same for this shape
        let r = shape_for(PieceKind::T).rotated(RotationDir::CounterClockwise);
        assert_eq!(r.id_rows(), vec![vec![0, 1, 0], vec![0, 1, 1], vec![0, 1, 0]]);
    }

    #[test]
    fn test_rotate_there_and_back_is_identity() {
        for kind in PieceKind::ALL {
            let m = shape_for(kind);
            let back = m
                .rotated(RotationDir::Clockwise)
                .rotated(RotationDir::CounterClockwise);
            assert_eq!(back, m, "{:?}", kind);
        }
    }

    #[test]
    fn test_four_rotations_is_identity() {
        for kind in PieceKind::ALL {
            let m = shape_for(kind);
            let mut r = m;
            for _ in 0..4 {
                r = r.rotated(RotationDir::Clockwise);
            }
            assert_eq!(r, m, "{:?}", kind);
        }
    }

    #[test]
    fn test_o_rotation_is_unchanged() {
        let o = shape_for(PieceKind::O);
        assert_eq!(o.rotated(RotationDir::Clockwise), o);
    }

    #[test]
    fn test_shape_for_id_rejects_unknown() {
        assert!(shape_for_id(0).is_none());
        assert!(shape_for_id(8).is_none());
        assert_eq!(shape_for_id(5), Some(shape_for(PieceKind::I)));
    }
}
