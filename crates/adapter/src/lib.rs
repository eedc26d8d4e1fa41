//! Adapter module - remote control via TCP socket with JSON protocol
//!
//! This crate lets external agents and front-ends drive a session over a
//! TCP connection. It owns no game state: commands are queued for the game
//! loop and replies come back through [`Adapter::send`].
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7777)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller
//! 4. **Streaming**: Server sends observations and session events
//! 5. **Commanding**: Controller sends commands, game loop replies with an ack
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and requested capabilities
//! - **command**: A list of session commands (`start` takes `name` and `difficulty`)
//! - **control**: Claim or release controller status
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello with role and capabilities
//! - **observation**: Full session snapshot (board, active piece, score, etc.)
//! - **event**: Piece locks, line clears, level ups, game over, recorded scores
//! - **ack**: Per-command outcomes
//! - **error**: Error response with code and message
//!
//! # Environment Variables
//!
//! - `GHOST_TETRIS_HOST`: Bind address (default: "127.0.0.1")
//! - `GHOST_TETRIS_PORT`: Port number (default: 7777)
//! - `GHOST_TETRIS_MAX_PENDING`: Bounded command queue length (default: 10)
//! - `GHOST_TETRIS_WIRE_LOG`: Append every wire line to this file
//! - `GHOST_TETRIS_ADAPTER_DISABLED`: Set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"client":{"name":"bot","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Client -> Server: {"type":"command","seq":2,"commands":["start"],"name":"bot","difficulty":"standard"}
//! Server -> Client: {"type":"ack","seq":2,"ts":1234567892,"status":"ok","outcomes":["started"],"lines_cleared":0}
//! Server -> Client: {"type":"observation","seq":3,"ts":1234567893,"state":"playing",...}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use ghost_tetris_core as core;
pub use ghost_tetris_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use runtime::{Adapter, InboundCommand, InboundPayload, OutboundMessage};
pub use server::{build_observation, run_server, state_hash, ServerConfig};
