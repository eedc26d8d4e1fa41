//! Piece catalog and active piece behaviour through the facade

use ghost_tetris::core::{shape_for, shape_for_id, try_rotate, ActivePiece, Board};
use ghost_tetris::types::{PieceKind, RotationDir};

#[test]
fn test_catalog_sizes() {
    assert_eq!(shape_for(PieceKind::O).size(), 2);
    assert_eq!(shape_for(PieceKind::I).size(), 4);
    for kind in [PieceKind::T, PieceKind::L, PieceKind::J, PieceKind::S, PieceKind::Z] {
        assert_eq!(shape_for(kind).size(), 3, "{:?}", kind);
    }
    for kind in PieceKind::ALL {
        assert_eq!(shape_for(kind).occupied().count(), 4, "{:?}", kind);
    }
}

#[test]
fn test_catalog_lookup_by_id() {
    assert_eq!(shape_for_id(5), Some(shape_for(PieceKind::I)));
    assert_eq!(shape_for_id(0), None);
    assert_eq!(shape_for_id(8), None);
}

#[test]
fn test_four_rotations_restore_matrix() {
    for kind in PieceKind::ALL {
        let original = shape_for(kind);
        let mut m = original;
        for _ in 0..4 {
            m = m.rotated(RotationDir::Clockwise);
        }
        assert_eq!(m, original, "{:?}", kind);
        assert_eq!(
            original.rotated(RotationDir::Clockwise).rotated(RotationDir::CounterClockwise),
            original
        );
    }
}

#[test]
fn test_i_spawns_at_four_zero() {
    let board = Board::new();
    let piece = ActivePiece::spawn(PieceKind::I, &board).unwrap();
    assert_eq!((piece.x, piece.y), (4, 0));
    assert_eq!(piece.matrix.size(), 4);
}

#[test]
fn test_spawn_blocked_returns_none() {
    let mut board = Board::new();
    board.set(5, 1, Some(PieceKind::Z));
    assert!(ActivePiece::spawn(PieceKind::T, &board).is_none());
}

#[test]
fn test_failed_rotation_leaves_piece_untouched() {
    let board = Board::with_size(12, 20);
    // Rotation is never feasible when everything collides.
    let result = try_rotate(&shape_for(PieceKind::T), 5, 0, RotationDir::Clockwise, |_, _, _| true);
    assert!(result.is_none());

    let mut piece = ActivePiece::new(PieceKind::L, 12);
    let before = piece;
    let mut walled = board.clone();
    for y in 0..20 {
        for x in 0..12 {
            if !piece.matrix.occupied().any(|(mx, my, _)| piece.x + mx == x && piece.y + my == y) {
                walled.set(x, y, Some(PieceKind::O));
            }
        }
    }
    assert!(!piece.rotate(&walled, RotationDir::Clockwise));
    assert_eq!(piece, before);
}

#[test]
fn test_ghost_y_is_landing_row() {
    let board = Board::new();
    let piece = ActivePiece::spawn(PieceKind::O, &board).unwrap();
    assert_eq!(piece.ghost_y(&board), 18);

    let mut dropped = piece;
    let mut landed = board.clone();
    dropped.hard_drop(&mut landed);
    assert_eq!(dropped.y, 18);
    assert_eq!(landed.get(5, 19), Some(Some(PieceKind::O)));
}
