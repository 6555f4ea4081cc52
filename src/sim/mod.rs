//! Deterministic race simulation
//!
//! All gameplay rules live here. This module must stay pure:
//! - Randomness only through a `DiceSource`
//! - Stable iteration order (color enumeration order)
//! - No timers, rendering or network dependencies

pub mod color;
pub mod dice;
pub mod race;
pub mod state;

pub use color::Color;
pub use dice::{DicePair, DiceSource, RandomDice, RollPlan, plan_roll};
pub use race::{
    FinishUpdate, RaceError, RollTicket, apply_movement, begin_roll, complete_race,
    derive_finish_order, end_roll, reset, resolve_roll, reveal_reroll, submit_predictions,
};
pub use state::{
    GamePhase, PredictionResult, PredictionVerdict, Predictions, RaceOutcome, RaceState,
    SnailPositions,
};
