//! Headless Ghost Tetris runner (default binary).
//!
//! Owns one session and drives it with a fixed 16ms step. All input arrives
//! through the TCP control adapter; observations and events go back out the
//! same way.

use std::time::{Duration, Instant};

use anyhow::Result;

use ghost_tetris::adapter::Adapter;
use ghost_tetris::logging;
use ghost_tetris::runner::{Runner, RunnerConfig};
use ghost_tetris::types::TICK_MS;

fn main() -> Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("logger already installed: {}", e);
    }

    let Some(mut adapter) = Adapter::start_from_env()? else {
        log::info!("adapter disabled via GHOST_TETRIS_ADAPTER_DISABLED, nothing to drive");
        return Ok(());
    };
    log::info!("ready on {}", adapter.local_addr());

    let mut runner = Runner::new(RunnerConfig::from_env())?;

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        while let Some(inbound) = adapter.try_recv() {
            for msg in runner.handle_inbound(inbound) {
                adapter.send(msg);
            }
        }

        if last_tick.elapsed() >= tick_duration {
            last_tick += tick_duration;
            for msg in runner.step(TICK_MS) {
                adapter.send(msg);
            }
        } else {
            let remaining = tick_duration.saturating_sub(last_tick.elapsed());
            std::thread::sleep(remaining.min(Duration::from_millis(2)));
        }
    }
}
