//! # ringnode
//!
//! One participant of a peer group that coordinates only through broadcast
//! messages: Lamport clock, bully election, presence tracking and a
//! token ring for mutual exclusion.
//!
//! ## Architecture
//! ```text
//! MessageBus ⇄ NodeRuntime (event loop) ⇄ CoordinationNode (state machine)
//!                   ↓
//!              Diagnostics → /status, /log
//! ```
//!
//! `RedisBus` connects real processes; `MemoryBus` runs a whole group
//! inside one process for tests and simulations.

pub mod bootstrap;
pub mod bus;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod node;
pub mod routes;
pub mod state;
