use std::path::PathBuf;

use ghost_tetris::adapter::{InboundCommand, InboundPayload, OutboundMessage};
use ghost_tetris::core::{ActivePiece, Leaderboard, ScoreRecord};
use ghost_tetris::runner::{load_leaderboard, save_leaderboard, Runner, RunnerConfig};
use ghost_tetris::types::{Command, Difficulty, PieceKind};

fn scores_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "ghost-tetris-{}-{}.json",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn commands(seq: u64, commands: Vec<Command>) -> InboundCommand {
    InboundCommand {
        client_id: 1,
        seq,
        payload: InboundPayload::Commands(commands),
    }
}

fn broadcast_types(out: &[OutboundMessage]) -> Vec<String> {
    out.iter()
        .filter_map(|m| match m {
            OutboundMessage::Broadcast { line } => {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                match v["event"]["kind"].as_str() {
                    Some(kind) => Some(format!("event:{}", kind)),
                    None => v["type"].as_str().map(str::to_string),
                }
            }
            OutboundMessage::ToClient { .. } => None,
        })
        .collect()
}

#[test]
fn test_scored_game_is_saved_to_leaderboard_file() {
    let path = scores_path("saved");
    let mut runner = Runner::new(RunnerConfig {
        scores_path: Some(path.clone()),
        ..RunnerConfig::default()
    })
    .unwrap();

    runner.handle_inbound(commands(
        1,
        vec![Command::Start {
            name: "saver".to_string(),
            difficulty: Difficulty::Relaxed,
        }],
    ));

    // One O drop completes the bottom row for 10 points.
    let session = runner.session_mut();
    let width = session.board().width();
    for x in 0..width as i8 {
        if x != 5 && x != 6 {
            session.board_mut().set(x, 19, Some(PieceKind::T));
        }
    }
    if let Some(active) = session.active_mut() {
        *active = ActivePiece::new(PieceKind::O, width);
    }

    let out = runner.handle_inbound(commands(2, vec![Command::HardDrop]));
    let kinds = broadcast_types(&out);
    assert!(kinds.contains(&"event:lines_cleared".to_string()), "{:?}", kinds);

    let out = runner.handle_inbound(commands(3, vec![Command::End]));
    let kinds = broadcast_types(&out);
    assert_eq!(
        kinds,
        vec!["event:game_over", "event:score_recorded", "observation"]
    );

    assert_eq!(runner.leaderboard().len(), 1);
    let saved = load_leaderboard(&path).unwrap();
    assert_eq!(
        saved.records(),
        &[ScoreRecord {
            player_name: "saver".to_string(),
            score: 10,
            difficulty: Difficulty::Relaxed,
        }]
    );

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"name\": \"saver\""));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_existing_leaderboard_is_loaded() {
    let path = scores_path("existing");
    let mut board = Leaderboard::new();
    board.insert(ScoreRecord {
        player_name: "old".to_string(),
        score: 500,
        difficulty: Difficulty::Standard,
    });
    save_leaderboard(&path, &board).unwrap();

    let runner = Runner::new(RunnerConfig {
        scores_path: Some(path.clone()),
        ..RunnerConfig::default()
    })
    .unwrap();
    assert_eq!(runner.leaderboard().top(10)[0].player_name, "old");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_corrupt_leaderboard_is_an_error() {
    let path = scores_path("corrupt");
    std::fs::write(&path, "not json").unwrap();
    let result = Runner::new(RunnerConfig {
        scores_path: Some(path.clone()),
        ..RunnerConfig::default()
    });
    assert!(result.is_err());
    let _ = std::fs::remove_file(&path);
}
