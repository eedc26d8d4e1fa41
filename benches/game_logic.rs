use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ghost_tetris::adapter::build_observation;
use ghost_tetris::core::{shape_for, try_rotate, Board, Session, SessionConfig, SessionSnapshot};
use ghost_tetris::types::{Command, Difficulty, Outcome, PieceKind, RotationDir};

fn started() -> Session {
    let mut session = Session::new(SessionConfig::with_seed(12345));
    session.apply(Command::Start {
        name: "bench".to_string(),
        difficulty: Difficulty::Standard,
    });
    session
}

fn bench_tick(c: &mut Criterion) {
    let mut session = started();

    c.bench_function("session_tick_16ms", |b| {
        b.iter(|| {
            if session.tick(black_box(16)) == Some(Outcome::GameOver) {
                session.apply(Command::Restart);
            }
            session.take_events();
        })
    });
}

fn bench_line_clear(c: &mut Criterion) {
    c.bench_function("clear_4_lines", |b| {
        b.iter(|| {
            let mut board = Board::new();
            for y in 16..20 {
                for x in 0..12 {
                    board.set(x, y, Some(PieceKind::I));
                }
            }
            board.clear_full_rows();
        })
    });
}

fn bench_hard_drop(c: &mut Criterion) {
    c.bench_function("hard_drop_until_game_over", |b| {
        b.iter(|| {
            let mut session = started();
            while session.apply(Command::HardDrop) != Outcome::GameOver {}
            black_box(session.take_events());
        })
    });
}

fn bench_try_rotate(c: &mut Criterion) {
    let board = Board::new();
    let i = shape_for(PieceKind::I);

    c.bench_function("try_rotate_with_kicks", |b| {
        b.iter(|| {
            try_rotate(black_box(&i), 9, 0, RotationDir::Clockwise, |m, x, y| {
                board.collides(m, x, y)
            })
        })
    });
}

fn bench_observation(c: &mut Criterion) {
    let session = started();
    let mut snapshot = SessionSnapshot::default();

    c.bench_function("snapshot_and_observation", |b| {
        b.iter(|| {
            session.snapshot_into(&mut snapshot);
            black_box(build_observation(&snapshot, 1))
        })
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_line_clear,
    bench_hard_drop,
    bench_try_rotate,
    bench_observation
);
criterion_main!(benches);
