//! Session module - the game state machine
//!
//! A [`Session`] owns the board, the active piece, the hold slot, the next
//! queue and the score keeper. It is driven by two entry points:
//!
//! - [`Session::apply`] for discrete commands from an input layer
//! - [`Session::tick`] for elapsed time, which triggers the automatic drop
//!
//! Both return an [`Outcome`]. Side effects that presentation or persistence
//! layers care about are buffered as [`GameEvent`]s and drained with
//! [`Session::take_events`].
//!
//! Line clears are applied to the grid inside the lock itself; the
//! `LinesCleared` event only lets an effects layer animate what already
//! happened.

use crate::active::{ActivePiece, DropResult};
use crate::board::{Board, ClearedRows};
use crate::hold::{HoldExchange, HoldSlot};
use crate::leaderboard::ScoreRecord;
use crate::queue::{NextQueue, Randomizer};
use crate::scoring::{ClearTally, ScoreKeeper};
use crate::snapshot::{ActiveSnapshot, SessionSnapshot};
use crate::types::{
    ClearSize, Command, Difficulty, Outcome, PieceKind, RotationDir, SessionState, BOARD_HEIGHT,
    BOARD_WIDTH, MAX_MATRIX_SIZE,
};

/// Board size and randomness for new sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub width: u8,
    pub height: u8,
    /// Seed of the first episode; episode `n` uses `seed + n`
    pub seed: u64,
    pub randomizer: Randomizer,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            seed: 1,
            randomizer: Randomizer::Uniform,
        }
    }
}

impl SessionConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Keep dimensions between the largest piece matrix and the `i8` coordinate range
    fn sanitized(self) -> Self {
        let min = MAX_MATRIX_SIZE as u8;
        let max = i8::MAX as u8;
        let width = self.width.clamp(min, max);
        let height = self.height.clamp(min, max);
        if (width, height) != (self.width, self.height) {
            log::warn!(
                "board {}x{} is outside {}..={}, using {}x{}",
                self.width,
                self.height,
                min,
                max,
                width,
                height
            );
        }
        Self {
            width,
            height,
            ..self
        }
    }
}

/// Notifications for effects and persistence layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A piece was merged into the grid with its origin at (x, y)
    PieceLocked { kind: PieceKind, x: i8, y: i8 },
    /// Rows (pre-clear indices, bottom to top) removed by the last lock
    LinesCleared { rows: ClearedRows, size: ClearSize },
    LevelUp { level: u32 },
    GameOver,
    /// Emitted after `GameOver` when the final score is above zero
    ScoreRecorded(ScoreRecord),
}

/// One player's game, from start to game over
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    board: Board,
    active: Option<ActivePiece>,
    hold: HoldSlot,
    queue: NextQueue,
    scoring: ScoreKeeper,
    state: SessionState,
    player_name: String,
    /// Accumulated ms since the last drop
    drop_counter_ms: u32,
    /// Id of the current (or last) episode
    episode_id: u32,
    /// Episodes started so far
    episodes: u32,
    events: Vec<GameEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        Self {
            board: Board::with_size(config.width, config.height),
            active: None,
            hold: HoldSlot::new(),
            queue: NextQueue::new(config.seed, config.randomizer),
            scoring: ScoreKeeper::default(),
            state: SessionState::Idle,
            player_name: String::new(),
            drop_counter_ms: 0,
            episode_id: 0,
            episodes: 0,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable grid access for scenario setup
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    /// Mutable active piece access for scenario setup
    ///
    /// No collision check is made on changes done through this handle.
    pub fn active_mut(&mut self) -> Option<&mut ActivePiece> {
        self.active.as_mut()
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold.kind()
    }

    pub fn can_hold(&self) -> bool {
        self.hold.is_available()
    }

    pub fn next_piece(&self) -> PieceKind {
        self.queue.peek()
    }

    pub fn score(&self) -> u32 {
        self.scoring.score()
    }

    pub fn level(&self) -> u32 {
        self.scoring.level()
    }

    pub fn lines(&self) -> u32 {
        self.scoring.lines()
    }

    pub fn stats(&self) -> ClearTally {
        self.scoring.tally()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.scoring.difficulty()
    }

    pub fn fall_interval_ms(&self) -> u32 {
        self.scoring.fall_interval_ms()
    }

    pub fn drop_counter_ms(&self) -> u32 {
        self.drop_counter_ms
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    /// Seed of the current episode's next queue
    pub fn episode_seed(&self) -> u64 {
        self.config.seed.wrapping_add(self.episode_id as u64)
    }

    /// Landing row of the active piece
    pub fn ghost_y(&self) -> Option<i8> {
        self.active.map(|piece| piece.ghost_y(&self.board))
    }

    /// Drain buffered events, oldest first
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot_into(&self, out: &mut SessionSnapshot) {
        self.board.write_u8_grid(&mut out.grid);
        out.active = self.active.map(ActiveSnapshot::from);
        out.ghost_y = self.ghost_y();
        out.next = self.queue.peek();
        out.hold = self.hold.kind();
        out.can_hold = self.hold.is_available();
        out.score = self.scoring.score();
        out.level = self.scoring.level();
        out.lines = self.scoring.lines();
        out.state = self.state;
        out.difficulty = self.scoring.difficulty();
        out.fall_interval_ms = self.scoring.fall_interval_ms();
        out.stats = self.scoring.tally();
        out.episode_id = self.episode_id;
        out.seed = self.episode_seed();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut s = SessionSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    /// Apply one command
    ///
    /// Commands that do not fit the current state return `Outcome::Ignored`
    /// and change nothing.
    pub fn apply(&mut self, command: Command) -> Outcome {
        match (self.state, command) {
            (SessionState::Idle | SessionState::GameOver, Command::Start { name, difficulty }) => {
                self.begin(name, difficulty)
            }
            (SessionState::Idle | SessionState::GameOver, Command::Restart) => {
                let name = std::mem::take(&mut self.player_name);
                let difficulty = self.scoring.difficulty();
                self.begin(name, difficulty)
            }
            (SessionState::Playing, Command::Pause | Command::TogglePause) => {
                self.set_state(SessionState::Paused);
                Outcome::Paused
            }
            (SessionState::Paused, Command::Resume | Command::TogglePause) => {
                self.set_state(SessionState::Playing);
                Outcome::Resumed
            }
            (SessionState::Playing | SessionState::Paused, Command::End) => {
                self.finish();
                Outcome::GameOver
            }
            (SessionState::Playing, Command::MoveLeft) => self.shift(-1),
            (SessionState::Playing, Command::MoveRight) => self.shift(1),
            (SessionState::Playing, Command::RotateCw) => self.rotate(RotationDir::Clockwise),
            (SessionState::Playing, Command::RotateCcw) => {
                self.rotate(RotationDir::CounterClockwise)
            }
            (SessionState::Playing, Command::SoftDrop) => self.step_down(),
            (SessionState::Playing, Command::HardDrop) => self.hard_drop(),
            (SessionState::Playing, Command::Hold) => self.hold(),
            (state, command) => {
                log::trace!("{} ignored while {}", command.as_str(), state.as_str());
                Outcome::Ignored
            }
        }
    }

    /// Advance the automatic drop timer by `elapsed_ms`
    ///
    /// Returns the drop outcome when the accumulated time exceeds the fall
    /// interval, None otherwise. Only a playing session accumulates time.
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<Outcome> {
        if self.state != SessionState::Playing {
            return None;
        }
        self.drop_counter_ms = self.drop_counter_ms.saturating_add(elapsed_ms);
        if self.drop_counter_ms > self.scoring.fall_interval_ms() {
            return Some(self.step_down());
        }
        None
    }

    fn set_state(&mut self, state: SessionState) {
        log::debug!("session {} -> {}", self.state.as_str(), state.as_str());
        self.state = state;
    }

    fn begin(&mut self, name: String, difficulty: Difficulty) -> Outcome {
        self.episode_id = self.episodes;
        self.episodes = self.episodes.wrapping_add(1);

        self.board.clear();
        self.active = None;
        self.hold.reset();
        self.queue = NextQueue::new(self.episode_seed(), self.config.randomizer);
        self.scoring = ScoreKeeper::new(difficulty);
        self.drop_counter_ms = 0;
        self.player_name = name;

        log::info!(
            "episode {} started for '{}' on {}",
            self.episode_id,
            self.player_name,
            difficulty.as_str()
        );
        self.set_state(SessionState::Playing);

        if !self.spawn_next() {
            return Outcome::GameOver;
        }
        self.hold.rearm();
        Outcome::Started
    }

    /// Spawn the queued piece; tops out when the spawn is blocked
    fn spawn_next(&mut self) -> bool {
        let kind = self.queue.consume_and_refill();
        match ActivePiece::spawn(kind, &self.board) {
            Some(piece) => {
                log::debug!("spawned {} at ({}, {})", kind.as_str(), piece.x, piece.y);
                self.active = Some(piece);
                self.scoring.record_piece();
                true
            }
            None => {
                self.top_out();
                false
            }
        }
    }

    /// Game over from a blocked spawn: the grid is wiped, the score is kept
    fn top_out(&mut self) {
        self.board.clear();
        self.finish();
    }

    fn finish(&mut self) {
        self.active = None;
        self.set_state(SessionState::GameOver);
        self.events.push(GameEvent::GameOver);

        let score = self.scoring.score();
        log::info!(
            "episode {} over: score {} level {} lines {}",
            self.episode_id,
            score,
            self.scoring.level(),
            self.scoring.lines()
        );
        if score > 0 {
            self.events.push(GameEvent::ScoreRecorded(ScoreRecord {
                player_name: self.player_name.clone(),
                score,
                difficulty: self.scoring.difficulty(),
            }));
        }
    }

    fn shift(&mut self, dx: i8) -> Outcome {
        let Some(piece) = self.active.as_mut() else {
            return Outcome::Ignored;
        };
        if piece.shift(&self.board, dx) {
            Outcome::Moved
        } else {
            Outcome::Rejected
        }
    }

    fn rotate(&mut self, dir: RotationDir) -> Outcome {
        let Some(piece) = self.active.as_mut() else {
            return Outcome::Ignored;
        };
        if piece.rotate(&self.board, dir) {
            Outcome::Rotated
        } else {
            Outcome::Rejected
        }
    }

    fn step_down(&mut self) -> Outcome {
        let Some(mut piece) = self.active else {
            return Outcome::Ignored;
        };
        self.drop_counter_ms = 0;
        match piece.soft_drop(&mut self.board) {
            DropResult::Moved => {
                self.active = Some(piece);
                Outcome::Moved
            }
            DropResult::Locked => self.settle(piece),
        }
    }

    fn hard_drop(&mut self) -> Outcome {
        let Some(mut piece) = self.active else {
            return Outcome::Ignored;
        };
        self.drop_counter_ms = 0;
        let distance = piece.hard_drop(&mut self.board);
        log::trace!("hard drop {} rows", distance);
        self.settle(piece)
    }

    /// Clear rows and score after `piece` was merged, then spawn the next one
    fn settle(&mut self, piece: ActivePiece) -> Outcome {
        self.active = None;
        self.events.push(GameEvent::PieceLocked {
            kind: piece.kind,
            x: piece.x,
            y: piece.y,
        });

        let rows = self.board.sweep_completed_rows();
        let lines = rows.len();
        if let Some(size) = ClearSize::from_lines(lines) {
            self.board.clear_and_compact(&rows);
            let result = self.scoring.apply_clear(lines);
            log::debug!("cleared {} rows for {} points", lines, result.points);
            self.events.push(GameEvent::LinesCleared { rows, size });
            if let Some(level) = result.level_up {
                log::debug!("level up to {}", level);
                self.events.push(GameEvent::LevelUp { level });
            }
        }

        if !self.spawn_next() {
            return Outcome::GameOver;
        }
        self.hold.rearm();
        Outcome::Locked { lines: lines as u8 }
    }

    fn hold(&mut self) -> Outcome {
        let Some(piece) = self.active else {
            return Outcome::Ignored;
        };
        match self.hold.exchange(piece.kind) {
            HoldExchange::Unavailable => Outcome::Rejected,
            HoldExchange::Stashed => {
                if self.spawn_next() {
                    Outcome::Held
                } else {
                    Outcome::GameOver
                }
            }
            HoldExchange::Swapped(kind) => match ActivePiece::spawn(kind, &self.board) {
                Some(swapped) => {
                    self.active = Some(swapped);
                    Outcome::Held
                }
                None => {
                    self.top_out();
                    Outcome::GameOver
                }
            },
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(session: &mut Session) -> Outcome {
        session.apply(Command::Start {
            name: "ada".to_string(),
            difficulty: Difficulty::Standard,
        })
    }

    fn fill_row_except(board: &mut Board, y: i8, skip: &[i8]) {
        for x in 0..board.width() as i8 {
            if !skip.contains(&x) {
                board.set(x, y, Some(PieceKind::Z));
            }
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.active().is_none());
        assert_eq!(session.level(), 1);
        assert_eq!(session.board().width(), 12);
        assert_eq!(session.board().height(), 20);
    }

    #[test]
    fn test_start_spawns_piece() {
        let mut session = Session::default();
        assert_eq!(start(&mut session), Outcome::Started);
        assert_eq!(session.state(), SessionState::Playing);
        let piece = session.active().unwrap();
        assert_eq!(piece.y, 0);
        assert!(session.can_hold());
        assert_eq!(session.stats().pieces_placed, 1);
        assert_eq!(session.player_name(), "ada");
    }

    #[test]
    fn test_movement_ignored_when_idle() {
        let mut session = Session::default();
        assert_eq!(session.apply(Command::MoveLeft), Outcome::Ignored);
        assert_eq!(session.apply(Command::Pause), Outcome::Ignored);
        assert_eq!(session.apply(Command::End), Outcome::Ignored);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_ignored_while_playing() {
        let mut session = Session::default();
        start(&mut session);
        assert_eq!(start(&mut session), Outcome::Ignored);
        assert_eq!(session.apply(Command::Restart), Outcome::Ignored);
    }

    #[test]
    fn test_pause_freezes_drop_timer() {
        let mut session = Session::default();
        start(&mut session);
        assert_eq!(session.tick(300), None);
        assert_eq!(session.apply(Command::Pause), Outcome::Paused);
        assert_eq!(session.tick(10_000), None);
        assert_eq!(session.drop_counter_ms(), 300);
        assert_eq!(session.apply(Command::MoveLeft), Outcome::Ignored);
        assert_eq!(session.apply(Command::TogglePause), Outcome::Resumed);
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_tick_drops_only_when_strictly_past_interval() {
        let mut session = Session::default();
        start(&mut session);
        let y0 = session.active().unwrap().y;
        assert_eq!(session.tick(800), None);
        assert_eq!(session.tick(1), Some(Outcome::Moved));
        assert_eq!(session.active().unwrap().y, y0 + 1);
        assert_eq!(session.drop_counter_ms(), 0);
    }

    #[test]
    fn test_soft_drop_resets_timer() {
        let mut session = Session::default();
        start(&mut session);
        session.tick(500);
        assert_eq!(session.apply(Command::SoftDrop), Outcome::Moved);
        assert_eq!(session.drop_counter_ms(), 0);
    }

    #[test]
    fn test_hard_drop_locks_and_spawns() {
        let mut session = Session::default();
        start(&mut session);
        let next = session.next_piece();
        assert_eq!(session.apply(Command::HardDrop), Outcome::Locked { lines: 0 });
        assert_eq!(session.active().unwrap().kind, next);
        assert_eq!(session.stats().pieces_placed, 2);
        let events = session.take_events();
        assert!(matches!(events.as_slice(), [GameEvent::PieceLocked { .. }]));
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_hold_twice_is_noop() {
        let mut session = Session::default();
        start(&mut session);
        let first = session.active().unwrap().kind;
        assert_eq!(session.apply(Command::Hold), Outcome::Held);
        assert_eq!(session.hold_piece(), Some(first));
        assert!(!session.can_hold());
        let active = session.active();
        assert_eq!(session.apply(Command::Hold), Outcome::Rejected);
        assert_eq!(session.active(), active);
        assert_eq!(session.hold_piece(), Some(first));
    }

    #[test]
    fn test_hold_swaps_after_lock() {
        let mut session = Session::default();
        start(&mut session);
        let held = session.active().unwrap().kind;
        session.apply(Command::Hold);
        session.apply(Command::HardDrop);
        assert!(session.can_hold());
        let current = session.active().unwrap().kind;
        assert_eq!(session.apply(Command::Hold), Outcome::Held);
        assert_eq!(session.active().unwrap().kind, held);
        assert_eq!(session.active().unwrap().y, 0);
        assert_eq!(session.hold_piece(), Some(current));
    }

    #[test]
    fn test_line_clear_scores_and_emits() {
        let mut session = Session::default();
        start(&mut session);
        fill_row_except(session.board_mut(), 19, &[5, 6]);
        fill_row_except(session.board_mut(), 18, &[5, 6]);
        let piece = session.active_mut().unwrap();
        *piece = ActivePiece::new(PieceKind::O, 12);

        assert_eq!(session.apply(Command::HardDrop), Outcome::Locked { lines: 2 });
        assert_eq!(session.score(), 30);
        assert_eq!(session.lines(), 2);
        assert_eq!(session.stats().doubles, 1);
        let events = session.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::LinesCleared { size: ClearSize::Double, .. }
        )));
        assert!(session.board().cells().iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_blocked_spawn_is_game_over() {
        let mut session = Session::default();
        start(&mut session);
        // Leave the active piece's landing spot open but block the spawn area.
        for y in 0..4 {
            fill_row_except(session.board_mut(), y, &[0, 1]);
        }
        let piece = session.active_mut().unwrap();
        *piece = ActivePiece::new(PieceKind::O, 12);
        piece.x = 0;
        piece.y = 4;

        assert_eq!(session.apply(Command::HardDrop), Outcome::GameOver);
        assert_eq!(session.state(), SessionState::GameOver);
        assert_eq!(session.score(), 0);
        assert!(session.active().is_none());
        assert!(session.board().cells().iter().all(|c| c.is_none()));
        let events = session.take_events();
        assert_eq!(events.last(), Some(&GameEvent::GameOver));
    }

    #[test]
    fn test_end_records_positive_score() {
        let mut session = Session::default();
        start(&mut session);
        fill_row_except(session.board_mut(), 19, &[5, 6]);
        *session.active_mut().unwrap() = ActivePiece::new(PieceKind::O, 12);
        session.apply(Command::HardDrop);
        session.take_events();

        assert_eq!(session.apply(Command::End), Outcome::GameOver);
        let events = session.take_events();
        assert_eq!(events[0], GameEvent::GameOver);
        assert_eq!(
            events[1],
            GameEvent::ScoreRecorded(ScoreRecord {
                player_name: "ada".to_string(),
                score: 10,
                difficulty: Difficulty::Standard,
            })
        );
        // Voluntary end keeps the grid and the score.
        assert_eq!(session.score(), 10);
        assert!(session.board().cells().iter().any(|c| c.is_some()));
    }

    #[test]
    fn test_end_with_zero_score_records_nothing() {
        let mut session = Session::default();
        start(&mut session);
        session.apply(Command::End);
        assert_eq!(session.take_events(), vec![GameEvent::GameOver]);
    }

    #[test]
    fn test_restart_reuses_player_and_difficulty() {
        let mut session = Session::default();
        session.apply(Command::Start {
            name: "bo".to_string(),
            difficulty: Difficulty::Aggressive,
        });
        session.apply(Command::End);
        assert_eq!(session.apply(Command::Restart), Outcome::Started);
        assert_eq!(session.player_name(), "bo");
        assert_eq!(session.difficulty(), Difficulty::Aggressive);
        assert_eq!(session.fall_interval_ms(), 400);
        assert_eq!(session.episode_id(), 1);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_same_seed_same_pieces() {
        let mut a = Session::new(SessionConfig::with_seed(9));
        let mut b = Session::new(SessionConfig::with_seed(9));
        start(&mut a);
        start(&mut b);
        for _ in 0..10 {
            assert_eq!(a.active().map(|p| p.kind), b.active().map(|p| p.kind));
            a.apply(Command::HardDrop);
            b.apply(Command::HardDrop);
        }
    }

    #[test]
    fn test_snapshot_reflects_session() {
        let mut session = Session::default();
        start(&mut session);
        let snap = session.snapshot();
        assert_eq!(snap.state, SessionState::Playing);
        assert_eq!(snap.height(), 20);
        assert_eq!(snap.width(), 12);
        assert_eq!(snap.next, session.next_piece());
        assert_eq!(snap.ghost_y, session.ghost_y());
        assert_eq!(snap.active.map(|a| a.kind), session.active().map(|p| p.kind));
        assert_eq!(snap.fall_interval_ms, 800);
    }

    #[test]
    fn test_tiny_board_is_raised_to_piece_size() {
        let session = Session::new(SessionConfig {
            width: 2,
            height: 1,
            ..SessionConfig::default()
        });
        assert_eq!(session.board().width(), 4);
        assert_eq!(session.board().height(), 4);
    }

    #[test]
    fn test_oversized_board_is_capped_in_config() {
        let session = Session::new(SessionConfig {
            width: 255,
            height: 200,
            ..SessionConfig::default()
        });
        assert_eq!(session.config().width, 127);
        assert_eq!(session.config().height, 127);
        assert_eq!(session.board().width(), 127);
        assert_eq!(session.board().height(), 127);
    }
}
