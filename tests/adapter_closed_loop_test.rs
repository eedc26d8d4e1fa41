//! Adapter runtime plus runner, driven the way the binary drives them

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

use ghost_tetris::adapter::protocol::create_hello;
use ghost_tetris::adapter::{Adapter, ServerConfig};
use ghost_tetris::runner::{Runner, RunnerConfig};

fn pump(adapter: &mut Adapter, runner: &mut Runner) {
    while let Some(inbound) = adapter.try_recv() {
        for msg in runner.handle_inbound(inbound) {
            adapter.send(msg);
        }
    }
    for msg in runner.step(16) {
        adapter.send(msg);
    }
}

async fn read_until(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    adapter: &mut Adapter,
    runner: &mut Runner,
    pred: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    for _ in 0..200 {
        pump(adapter, runner);
        if let Ok(line) = tokio::time::timeout(Duration::from_millis(20), lines.next_line()).await {
            let line = line.unwrap().expect("connection closed");
            let v: serde_json::Value = serde_json::from_str(&line).unwrap();
            if pred(&v) {
                return v;
            }
        }
    }
    panic!("expected message never arrived");
}

#[test]
fn closed_loop_start_drop_and_observe() {
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let mut adapter = Adapter::start(config).expect("adapter failed to start");
    let mut runner = Runner::new(RunnerConfig::default()).unwrap();
    let addr = adapter.local_addr();

    tokio_test::block_on(async {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let hello = serde_json::to_string(&create_hello(1, "closed-loop", "1.0.0")).unwrap();
        writer.write_all(hello.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();

        let welcome =
            read_until(&mut lines, &mut adapter, &mut runner, |v| v["type"] == "welcome").await;
        assert_eq!(welcome["role"], "controller");

        let idle =
            read_until(&mut lines, &mut adapter, &mut runner, |v| v["type"] == "observation")
                .await;
        assert_eq!(idle["state"], "idle");

        let command = r#"{"type":"command","seq":2,"commands":["start","hardDrop"],"name":"loop"}"#;
        writer.write_all(command.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();

        let ack = read_until(&mut lines, &mut adapter, &mut runner, |v| v["type"] == "ack").await;
        assert_eq!(ack["seq"], 2);
        assert_eq!(ack["outcomes"], serde_json::json!(["started", "locked"]));

        let locked = read_until(&mut lines, &mut adapter, &mut runner, |v| {
            v["type"] == "event" && v["event"]["kind"] == "piece_locked"
        })
        .await;
        assert!(locked["event"]["piece"].is_string());

        let playing = read_until(&mut lines, &mut adapter, &mut runner, |v| {
            v["type"] == "observation" && v["state"] == "playing"
        })
        .await;
        assert_eq!(playing["difficulty"], "standard");
        assert_eq!(playing["stats"]["pieces_placed"], 2);
    });

    assert_eq!(runner.session().player_name(), "loop");
}
