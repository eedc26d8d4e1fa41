//! Scoring module - turns line clears into points, levels and fall speed
//!
//! Points for one lock clearing `n` rows at level `L`:
//!
//! | Rows | Multiplier sum | Points |
//! |------|----------------|--------|
//! | 1 | 1 | 10 × L |
//! | 2 | 1 + 2 | 30 × L |
//! | 3 | 1 + 2 + 4 | 70 × L |
//! | 4 | 1 + 2 + 4 + 8 | 150 × L |
//!
//! Level is `lines / 10 + 1`. Each level shortens the fall interval by 50ms
//! down to a 100ms floor.

use crate::types::{
    ClearSize, Difficulty, FALL_INTERVAL_FLOOR_MS, FALL_INTERVAL_STEP_MS, LINES_PER_LEVEL,
    LINE_CLEAR_BASE_POINTS,
};

/// Points for clearing `lines` rows in one lock at `level`
pub fn line_clear_score(lines: u32, level: u32) -> u32 {
    if lines == 0 {
        return 0;
    }
    let multiplier_sum = (1u32 << lines.min(31)) - 1;
    multiplier_sum * LINE_CLEAR_BASE_POINTS * level
}

/// Level reached after `total_lines` cleared rows
pub fn calculate_level(total_lines: u32) -> u32 {
    total_lines / LINES_PER_LEVEL + 1
}

/// Automatic drop interval at `level` for `difficulty`
pub fn fall_interval_ms(difficulty: Difficulty, level: u32) -> u32 {
    let reduction = level.saturating_sub(1).saturating_mul(FALL_INTERVAL_STEP_MS);
    difficulty
        .base_fall_interval_ms()
        .saturating_sub(reduction)
        .max(FALL_INTERVAL_FLOOR_MS)
}

/// Per-size clear counts plus pieces placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearTally {
    pub pieces_placed: u32,
    pub singles: u32,
    pub doubles: u32,
    pub triples: u32,
    pub tetrises: u32,
}

impl ClearTally {
    pub fn record(&mut self, size: ClearSize) {
        match size {
            ClearSize::Single => self.singles += 1,
            ClearSize::Double => self.doubles += 1,
            ClearSize::Triple => self.triples += 1,
            ClearSize::Tetris => self.tetrises += 1,
        }
    }
}

/// What one lock contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    pub points: u32,
    /// The new level, if this clear raised it
    pub level_up: Option<u32>,
}

/// Score, level, line count and fall speed for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreKeeper {
    difficulty: Difficulty,
    score: u32,
    level: u32,
    lines: u32,
    fall_interval_ms: u32,
    tally: ClearTally,
}

impl ScoreKeeper {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            score: 0,
            level: 1,
            lines: 0,
            fall_interval_ms: difficulty.base_fall_interval_ms(),
            tally: ClearTally::default(),
        }
    }

    /// Apply one lock's clear of `lines` rows
    pub fn apply_clear(&mut self, lines: usize) -> ScoreResult {
        let Some(size) = ClearSize::from_lines(lines) else {
            return ScoreResult {
                points: 0,
                level_up: None,
            };
        };

        let count = size.lines() as u32;
        let points = line_clear_score(count, self.level);
        self.score = self.score.saturating_add(points);
        self.lines += count;
        self.tally.record(size);

        let new_level = calculate_level(self.lines);
        let level_up = if new_level > self.level {
            self.level = new_level;
            self.fall_interval_ms = fall_interval_ms(self.difficulty, new_level);
            Some(new_level)
        } else {
            None
        };

        ScoreResult { points, level_up }
    }

    pub fn record_piece(&mut self) {
        self.tally.pieces_placed += 1;
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn fall_interval_ms(&self) -> u32 {
        self.fall_interval_ms
    }

    pub fn tally(&self) -> ClearTally {
        self.tally
    }
}

impl Default for ScoreKeeper {
    fn default() -> Self {
        Self::new(Difficulty::default())
    }
}
