//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server. The loop
//! drains [`InboundCommand`]s with [`Adapter::try_recv`] and hands replies back
//! through [`Adapter::send`] without ever blocking on the network.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::server::{run_server, ServerConfig};
use crate::types::Command;

/// How long [`Adapter::start`] waits for the listener to bind
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Message delivered to the game loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub client_id: u64,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Commands to apply in order, then ack
    Commands(Vec<Command>),
    /// Send this client a fresh observation
    SnapshotRequest,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: u64, line: String },
    /// Sent to every client streaming observations
    Broadcast { line: String },
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    addr: SocketAddr,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Adapter {
    /// Start the adapter and wait until it is listening.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (ready_tx, ready_rx) = oneshot::channel::<SocketAddr>();

        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let server =
            rt.spawn(async move { run_server(config, cmd_tx, out_rx, Some(ready_tx)).await });

        let addr = rt.block_on(async {
            match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
                Ok(Ok(addr)) => Ok(addr),
                Ok(Err(_)) => match server.await {
                    Ok(Err(e)) => Err(e),
                    _ => Err(anyhow::anyhow!("adapter server stopped before listening")),
                },
                Err(_) => Err(anyhow::anyhow!("adapter did not start within {:?}", READY_TIMEOUT)),
            }
        })?;

        Ok(Self {
            _rt: rt,
            addr,
            cmd_rx,
            out_tx,
        })
    }

    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `GHOST_TETRIS_ADAPTER_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerConfig::is_disabled() {
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Serialize `msg` and send it to one client
    pub fn send_to<T: Serialize>(&self, client_id: u64, msg: &T) {
        match serde_json::to_string(msg) {
            Ok(line) => self.send(OutboundMessage::ToClient { client_id, line }),
            Err(e) => log::error!("failed to encode message for client {}: {}", client_id, e),
        }
    }

    /// Serialize `msg` and send it to every streaming client
    pub fn broadcast<T: Serialize>(&self, msg: &T) {
        match serde_json::to_string(msg) {
            Ok(line) => self.send(OutboundMessage::Broadcast { line }),
            Err(e) => log::error!("failed to encode broadcast: {}", e),
        }
    }
}
