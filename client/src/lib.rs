//! # Observer Library
//!
//! This library provides the observer side of the position synchronization
//! session. Every observer keeps its own kinematic copy of every player and
//! extrapolates positions locally; the authority only tells it when velocities
//! change and, now and then, where the majority believes a player really is.
//!
//! ## Architecture Overview
//!
//! ### Local Extrapolation
//! A relayed `MoveCommand` sets a player's velocity from the command's game
//! time. Between commands positions are computed on demand from the last
//! checkpoint, so no per-frame simulation is needed.
//!
//! ### Self Reporting
//! On a fixed cadence the observer predicts every tracked player at the
//! current game time and sends the whole batch to the authority in one
//! `PositionSync`.
//!
//! ### Reconciliation
//! Arbitration verdicts arrive as `PositionUpdate`. Small disagreements are
//! tolerated; anything beyond the correction threshold snaps the local state
//! to the verdict while keeping the current velocity.
//!
//! ### Clock Alignment
//! The welcome message fixes the observer's game time to the authority's.
//! Later time broadcasts only rebase the clock once drift exceeds tolerance.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! The observer's map of kinematic states and the operations on it.
//!
//! ### Observer Module (`observer`)
//! Packet handling plus the message and self-report loops.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::observer::Observer;
//! use shared::{LocalTransport, SyncConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shared::TransportError> {
//!     let transport = Arc::new(LocalTransport::new(100));
//!     let observer = Observer::connect(transport, "client_0", "alice", SyncConfig::default()).await?;
//!
//!     observer.move_player(1.0, 0.0).await;
//!     println!("{:?}", observer.position("alice").await);
//!
//!     observer.stop().await;
//!     Ok(())
//! }
//! ```

pub mod observer;
pub mod world;
