//! # Neonfall Server Library
//!
//! Authoritative server for a real-time multiplayer 3D world: an infinite
//! procedurally generated descent of platforms with proximity voice chat.
//! The server owns every player record, relays movement, routes audio by
//! spatial distance and enforces session rules (respawn cooldown, admin
//! privilege, chat commands).
//!
//! ## Architecture
//!
//! ### Single serializing event loop
//! Every inbound session event is handled to completion on one
//! `tokio::select!` loop before the next is considered, so per-player
//! mutation is race-free without locking. Background timers (respawn
//! cooldown expiry, the audio liveness sweep) deliver onto the same
//! channel as network events and therefore share the serialization
//! boundary.
//!
//! ### Deterministic world
//! The world is never stored. Platform positions and types are pure
//! functions of the platform index, so each client reconstructs the same
//! infinite layout from a small immutable config blob sent once at init.
//!
//! ### Best-effort delivery
//! Communication runs over UDP with bincode-encoded packets. Movement
//! updates and audio frames are transient real-time state: they are
//! queued fire-and-forget and may be dropped under load, never blocking
//! the sender's event processing. Proximity culling keeps audio fan-out
//! at O(players) per frame.
//!
//! ## Module Organization
//!
//! - [`world`]: deterministic platform generator
//! - [`session`]: connection lifecycle, capacity, admin flag, timeouts
//! - [`game`]: authoritative player registry and the respawn machine
//! - [`commands`]: chat parsing and command dispatch
//! - [`router`]: outbound directives and proximity audio selection
//! - [`network`]: UDP transport and the main event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::WorldConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         64,
//!         "letmein".to_string(),
//!         WorldConfig::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod game;
pub mod network;
pub mod router;
pub mod session;
pub mod world;
