//! Ghost Tetris (workspace facade crate).
//!
//! The game rules live in dedicated crates under `crates/` and are re-exported
//! here as `ghost_tetris::{types, core, adapter}`. This crate adds the pieces
//! the headless binary needs: a stderr logger and the [`runner`] that connects
//! a session to the control adapter.

pub use ghost_tetris_adapter as adapter;
pub use ghost_tetris_core as core;
pub use ghost_tetris_types as types;

pub mod logging;
pub mod runner;
