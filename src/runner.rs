//! Headless game loop glue.
//!
//! A [`Runner`] owns one session and the local leaderboard. It turns inbound
//! adapter commands and elapsed time into outbound wire lines: acks for the
//! sender, and events plus observations for every streaming client.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::adapter::{
    build_observation, create_ack, create_event, state_hash, InboundCommand, InboundPayload,
    OutboundMessage, StateHash,
};
use crate::core::{
    GameEvent, Leaderboard, Randomizer, ScoreRecord, Session, SessionConfig, SessionSnapshot,
};

/// Runner settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    pub session: SessionConfig,
    /// Leaderboard file; scores stay in memory when unset
    pub scores_path: Option<PathBuf>,
}

impl RunnerConfig {
    /// Read `GHOST_TETRIS_SEED`, `GHOST_TETRIS_RANDOMIZER` and `GHOST_TETRIS_SCORES_PATH`
    pub fn from_env() -> Self {
        use std::env;

        let mut session = SessionConfig::default();
        if let Some(seed) = env::var("GHOST_TETRIS_SEED").ok().and_then(|s| s.trim().parse().ok()) {
            session.seed = seed;
        }
        if let Ok(name) = env::var("GHOST_TETRIS_RANDOMIZER") {
            match Randomizer::from_str(&name) {
                Some(r) => session.randomizer = r,
                None => log::warn!(
                    "unknown randomizer '{}', keeping {:?}",
                    name,
                    session.randomizer
                ),
            }
        }

        let scores_path = env::var("GHOST_TETRIS_SCORES_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            session,
            scores_path,
        }
    }
}

/// Read a leaderboard file; a missing file is an empty board
pub fn load_leaderboard(path: &Path) -> anyhow::Result<Leaderboard> {
    match std::fs::read_to_string(path) {
        Ok(json) => Leaderboard::from_json(&json)
            .with_context(|| format!("invalid leaderboard file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Leaderboard::new()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

pub fn save_leaderboard(path: &Path, leaderboard: &Leaderboard) -> anyhow::Result<()> {
    let json = leaderboard.to_json()?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub struct Runner {
    session: Session,
    leaderboard: Leaderboard,
    scores_path: Option<PathBuf>,
    snapshot: SessionSnapshot,
    last_hash: Option<StateHash>,
    out_seq: u64,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> anyhow::Result<Self> {
        let leaderboard = match config.scores_path.as_deref() {
            Some(path) => load_leaderboard(path)?,
            None => Leaderboard::new(),
        };
        log::info!("leaderboard loaded with {} records", leaderboard.len());

        Ok(Self {
            session: Session::new(config.session),
            leaderboard,
            scores_path: config.scores_path,
            snapshot: SessionSnapshot::default(),
            last_hash: None,
            out_seq: 0,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Direct session access for setup in tests and tools
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    fn next_seq(&mut self) -> u64 {
        self.out_seq += 1;
        self.out_seq
    }

    /// Apply one message from the adapter
    pub fn handle_inbound(&mut self, inbound: InboundCommand) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        match inbound.payload {
            InboundPayload::Commands(commands) => {
                let outcomes: Vec<_> = commands
                    .into_iter()
                    .map(|command| self.session.apply(command))
                    .collect();
                push_to(&mut out, inbound.client_id, &create_ack(inbound.seq, &outcomes));
                self.flush(&mut out);
            }
            InboundPayload::SnapshotRequest => {
                self.session.snapshot_into(&mut self.snapshot);
                let seq = self.next_seq();
                let obs = build_observation(&self.snapshot, seq);
                push_to(&mut out, inbound.client_id, &obs);
            }
        }
        out
    }

    /// Advance the session clock by `elapsed_ms`
    pub fn step(&mut self, elapsed_ms: u32) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        self.session.tick(elapsed_ms);
        self.flush(&mut out);
        out
    }

    /// Broadcast pending events, then an observation if the state changed
    fn flush(&mut self, out: &mut Vec<OutboundMessage>) {
        for event in self.session.take_events() {
            if let GameEvent::ScoreRecorded(record) = &event {
                self.record_score(record.clone());
            }
            let seq = self.next_seq();
            push_broadcast(out, &create_event(seq, &event));
        }

        self.session.snapshot_into(&mut self.snapshot);
        let hash = state_hash(&self.snapshot);
        if self.last_hash != Some(hash) {
            self.last_hash = Some(hash);
            let seq = self.next_seq();
            push_broadcast(out, &build_observation(&self.snapshot, seq));
        }
    }

    fn record_score(&mut self, record: ScoreRecord) {
        match self.leaderboard.insert(record) {
            Some(rank) => log::info!("score recorded at rank {}", rank + 1),
            None => log::debug!("score below the leaderboard cutoff"),
        }
        if let Some(path) = self.scores_path.as_deref() {
            if let Err(e) = save_leaderboard(path, &self.leaderboard) {
                log::warn!("{:#}", e);
            }
        }
    }
}

fn encode<T: Serialize>(msg: &T) -> Option<String> {
    serde_json::to_string(msg)
        .map_err(|e| log::error!("failed to encode outbound message: {}", e))
        .ok()
}

fn push_to<T: Serialize>(out: &mut Vec<OutboundMessage>, client_id: u64, msg: &T) {
    if let Some(line) = encode(msg) {
        out.push(OutboundMessage::ToClient { client_id, line });
    }
}

fn push_broadcast<T: Serialize>(out: &mut Vec<OutboundMessage>, msg: &T) {
    if let Some(line) = encode(msg) {
        out.push(OutboundMessage::Broadcast { line });
    }
}
