//! Local leaderboard - the best score records, highest first
//!
//! Serialized as a JSON array of `{"name", "score", "difficulty"}` objects.

use serde::{Deserialize, Serialize};

use crate::types::{Difficulty, LEADERBOARD_CAPACITY};

/// One finished session worth keeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "name")]
    pub player_name: String,
    pub score: u32,
    pub difficulty: Difficulty,
}

/// Records sorted by score, descending, capped at a fixed capacity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    records: Vec<ScoreRecord>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored leaderboard, re-sorting and truncating it
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut records: Vec<ScoreRecord> = serde_json::from_str(json)?;
        records.sort_by(|a, b| b.score.cmp(&a.score));
        records.truncate(LEADERBOARD_CAPACITY);
        Ok(Self { records })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Insert a record and return its 1-based rank
    ///
    /// Ties rank below existing records with the same score. Returns None when
    /// the record does not make the cut.
    pub fn insert(&mut self, record: ScoreRecord) -> Option<usize> {
        let pos = self.records.partition_point(|r| r.score >= record.score);
        if pos >= LEADERBOARD_CAPACITY {
            return None;
        }
        self.records.insert(pos, record);
        self.records.truncate(LEADERBOARD_CAPACITY);
        Some(pos + 1)
    }

    /// The best `n` records
    pub fn top(&self, n: usize) -> &[ScoreRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
