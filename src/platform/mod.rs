//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Timers (tokio on native, `setTimeout` in the browser)

pub mod time;

#[cfg(target_arch = "wasm32")]
pub use time::BrowserSleeper;
#[cfg(not(target_arch = "wasm32"))]
pub use time::TokioSleeper;
pub use time::{InstantSleeper, Sleeper};
