//! Race state and core simulation types
//!
//! Everything a new race creates, and a reset throws away, lives here.

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::color::Color;
use super::dice::DicePair;
use crate::consts::*;

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Waiting for the player's winner/loser picks
    #[default]
    Prediction,
    /// Dice are being rolled
    Racing,
    /// All six snails crossed the finish line
    Finished,
}

/// The player's picks, captured once before racing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predictions {
    pub winner: Color,
    pub loser: Color,
}

/// Track position of every snail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnailPositions([u8; SNAIL_COUNT]);

impl SnailPositions {
    #[inline]
    pub fn get(&self, color: Color) -> u8 {
        self.0[color.index()]
    }

    /// Move a snail forward, clamped at the finish line.
    /// Returns the new position.
    pub fn advance(&mut self, color: Color, steps: u8) -> u8 {
        let slot = &mut self.0[color.index()];
        *slot = slot.saturating_add(steps).min(FINISH_POSITION);
        *slot
    }

    #[inline]
    pub fn is_finished(&self, color: Color) -> bool {
        self.get(color) == FINISH_POSITION
    }

    /// Colors sitting on the finish line, in enumeration order
    pub fn finished(&self) -> Vec<Color> {
        Color::ALL
            .into_iter()
            .filter(|c| self.is_finished(*c))
            .collect()
    }

    /// Colors still racing, in enumeration order
    pub fn active(&self) -> Vec<Color> {
        Color::ALL
            .into_iter()
            .filter(|c| !self.is_finished(*c))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Color, u8)> + '_ {
        Color::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, color: Color, position: u8) {
        self.0[color.index()] = position.min(FINISH_POSITION);
    }
}

// Serialized as a `{ "red": 0, ... }` map for the UI.
impl Serialize for SnailPositions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Complete race state
#[derive(Debug, Clone, Default)]
pub struct RaceState {
    /// Bumped by every reset; continuations from an older race compare
    /// against it before writing.
    pub race_id: u64,
    pub phase: GamePhase,
    pub positions: SnailPositions,
    /// Most recent roll as currently revealed (None before the first roll)
    pub dice: Option<DicePair>,
    pub predictions: Option<Predictions>,
    /// Colors in the order they first reached the finish line
    pub finish_order: Vec<Color>,
    /// Roll actions taken this race
    pub total_rolls: u32,
    /// A roll is between its initial reveal and its movement
    pub rolling: bool,
}

impl RaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn winner(&self) -> Option<Color> {
        self.finish_order.first().copied()
    }

    pub fn loser(&self) -> Option<Color> {
        if self.finish_order.len() == SNAIL_COUNT {
            self.finish_order.last().copied()
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.finish_order.len() == SNAIL_COUNT
    }

    /// Final result, once every snail has finished
    pub fn outcome(&self) -> Option<RaceOutcome> {
        let order: [Color; SNAIL_COUNT] = self.finish_order.as_slice().try_into().ok()?;
        Some(RaceOutcome {
            finish_order: order,
            total_rolls: self.total_rolls,
            predictions: self.predictions,
        })
    }
}

/// Snapshot of a finished race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RaceOutcome {
    pub finish_order: [Color; SNAIL_COUNT],
    pub total_rolls: u32,
    pub predictions: Option<Predictions>,
}

impl RaceOutcome {
    pub fn winner(&self) -> Color {
        self.finish_order[0]
    }

    pub fn second_place(&self) -> Color {
        self.finish_order[1]
    }

    pub fn last_place(&self) -> Color {
        self.finish_order[SNAIL_COUNT - 1]
    }

    /// 1-based standings
    pub fn standings(&self) -> impl Iterator<Item = (usize, Color)> + '_ {
        self.finish_order.iter().enumerate().map(|(i, c)| (i + 1, *c))
    }

    /// How the player's picks fared (None if no picks were made)
    pub fn score(&self) -> Option<PredictionResult> {
        let picks = self.predictions?;
        Some(PredictionResult {
            winner_correct: picks.winner == self.winner(),
            loser_correct: picks.loser == self.last_place(),
        })
    }
}

/// Verdict on the player's predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictionResult {
    pub winner_correct: bool,
    pub loser_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionVerdict {
    Perfect,
    Partial,
    Missed,
}

impl PredictionResult {
    pub fn verdict(&self) -> PredictionVerdict {
        match (self.winner_correct, self.loser_correct) {
            (true, true) => PredictionVerdict::Perfect,
            (false, false) => PredictionVerdict::Missed,
            _ => PredictionVerdict::Partial,
        }
    }
}
