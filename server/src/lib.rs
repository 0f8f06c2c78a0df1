//! # Balloon Party Server Library
//!
//! This library provides the authoritative server for a small party game.
//! One big "screen" shows balloons, and many "mobile" phones submit
//! balloons and throw darts at them. The server holds the only copy of the
//! game state and relays events so every client sees the same round.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Balloons, their submitters and whoever hit them live only on the server.
//! Clients render what they are told and never decide a hit themselves.
//!
//! ### Connection Management
//! Handles the lifecycle of client connections:
//! - Connection establishment and handle assignment
//! - Role registration (phone or screen)
//! - Disconnection cleanup
//!
//! ### Event Relay
//! Results go back to the phone that threw the dart, while new balloons,
//! hits, start and reset signals are fanned out to everyone.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Connection tasks decode frames and forward them over a channel to one
//! loop that owns all game state. Handlers run to completion one at a time,
//! which is what guarantees a balloon is hit at most once.
//!
//! ### WebSocket Communication
//! Each client holds one WebSocket. Every text frame is a JSON envelope
//! `{"event": "...", "data": ...}` as defined in the `shared` crate.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Maps each live connection to its role and, once known, its profile.
//!
//! ### Store Module (`store`)
//! Keeps submitted balloons under monotonically increasing ids and
//! performs the one-time hit assignment.
//!
//! ### Game Module (`game`)
//! Validates and applies submit, start, shoot, reset and results requests.
//!
//! ### Hub Module (`hub`)
//! Delivers outbound events, either to all connections or to one.
//!
//! ### Network Module (`network`)
//! Accepts WebSocket connections and runs the main event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind("0.0.0.0:3000").await?;
//!
//!     // Accepts connections and applies client events until the
//!     // process is stopped
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod game;
pub mod hub;
pub mod network;
pub mod registry;
pub mod store;
