//! # Authority Library
//!
//! This library provides the authority side of the position synchronization
//! session. Unlike a classic authoritative game server it never simulates
//! movement: observers compute positions themselves, and the authority only
//! relays intents and settles disagreements.
//!
//! ## Core Responsibilities
//!
//! ### Intent Relay
//! A `Move` from any observer is rebroadcast unchanged as a `MoveCommand` to
//! every observer, including the sender. Each observer then applies the
//! velocity change to its own kinematic copy of the player.
//!
//! ### Report Collection
//! Observers periodically report where they believe every player is. The
//! authority keeps only the latest report per (player, observer) pair in the
//! current report window.
//!
//! ### Arbitration
//! At a fixed cadence the window is swapped for an empty one and every player's
//! reports are arbitrated by majority vote. The verdict is stored in the roster
//! and broadcast as a `PositionUpdate`.
//!
//! ### Time Reference
//! The authority's clock is the session's reference. It is handed out on
//! join and broadcast periodically so observers can correct drift.
//!
//! ## Module Organization
//!
//! ### Authority Module (`authority`)
//! Packet handlers and the three background loops (messages, time sync,
//! arbitration), coordinated through one stop signal.
//!
//! ### Report Window Module (`report_window`)
//! The per-cycle buffer of position reports.
//!
//! ### Roster Module (`roster`)
//! Joined players and their last arbitrated positions.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::authority::Authority;
//! use shared::{LocalTransport, SyncConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SyncConfig::default();
//!     let transport = Arc::new(LocalTransport::new(config.queue_capacity));
//!
//!     let authority = Authority::start(Arc::clone(&transport), &config);
//!
//!     // ... register observers on the same transport ...
//!
//!     authority.stop().await;
//! }
//! ```

pub mod authority;
pub mod report_window;
pub mod roster;
