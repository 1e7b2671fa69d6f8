//! Load test driver for the game backend.
//!
//! Provides typed TOML configuration, the per-user session state, the
//! journey step sequencer, the score payload generator, and a small
//! virtual-user runner with an outcome tally.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod journey;
pub mod logging;
pub mod score;
pub mod session;
pub mod summary;
pub mod vu;
