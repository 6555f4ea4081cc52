//! Snail Race - a six-snail dice race with predictions
//!
//! Core modules:
//! - `sim`: Deterministic race rules (dice, movement, finish order, phases)
//! - `controller`: Paces rolls through their reveal steps
//! - `persistence`: Saves finished races to the statistics service
//! - `platform`: Browser/native timer abstraction
//! - `retry`: Exponential backoff for fallible async calls
//! - `stats`: Aggregate win statistics

pub mod controller;
pub mod persistence;
pub mod platform;
pub mod retry;
pub mod settings;
pub mod sim;
pub mod stats;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use controller::{RaceController, RaceSnapshot, RollReport};
pub use settings::Settings;
pub use sim::{Color, GamePhase};

/// Game configuration constants
pub mod consts {
    /// Number of snails (one per color)
    pub const SNAIL_COUNT: usize = 6;

    /// Track squares: start (0) + 7 spaces + finish (8)
    pub const TRACK_LENGTH: u8 = 9;
    /// Position of the finish line
    pub const FINISH_POSITION: u8 = TRACK_LENGTH - 1;

    /// Statistics service used when `API_BASE_URL` is not set
    pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
}
