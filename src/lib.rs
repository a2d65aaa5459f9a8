//! Dual-board bughouse orchestrator.
//!
//! ```text
//!                  Board A                      Board B
//!            +----------------+           +----------------+
//!            |  Bot1 (White)  |           | Partner (White)|
//!            |     vs.        |           |     vs.        |
//!            | Human (Black)  |           | Bot2 (Black)   |
//!            +----------------+           +----------------+
//!                     \                           /
//!                      \---- piece_flow routes ---/
//!                        captures to the other
//!                        board's same-color pool
//! ```
//! Teams are {Human, Partner} vs {Bot1, Bot2}; partner-request pairs are
//! Bot1↔Bot2 and Partner↔Human.
//!
//! - [`position`] — boards, holdings, and moves/drops (C3).
//! - [`uci`] — the UCI subprocess transport (C1).
//! - [`pool`] — bounded pool of auxiliary evaluation engines (C2).
//! - [`piece_flow`] — cross-board capture routing (C4).
//! - [`controller`] — ties the boards and engines together into a game (C5).
//! - [`stall`] — the probabilistic stalling/partner-request machine (C6).
//! - [`events`] — the game event bus observers subscribe to (C7).
//! - [`config`] — layered TOML + env configuration (C8).
//! - [`error`] — the crate-wide error taxonomy (C9).
//! - [`evaluation`] — UCI score parsing/normalization for the stall decision cycle.
//! - [`chat`] and [`variant`] — chat-line templates and variant-file parsing.
//! - [`clock`] — the four seat clocks and the diagonal up-on-time rule.

pub mod chat;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod piece_flow;
pub mod pool;
pub mod position;
pub mod stall;
pub mod uci;
pub mod variant;

pub use controller::GameController;
pub use error::{OrchestratorError, OrchestratorResult};
