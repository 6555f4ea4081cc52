//! Color dice and the reroll-avoidance rule
//!
//! A roll is drawn in two stages. The initial pair is drawn over all six
//! colors and is always shown. Any die that landed on a snail already at
//! the finish line is then redrawn from the snails still racing, and that
//! reroll is revealed separately before anything moves.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::color::Color;
use super::state::SnailPositions;

/// Two dice faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DicePair(pub Color, pub Color);

impl DicePair {
    /// Both dice show the same color (that snail moves 2)
    pub fn is_double(&self) -> bool {
        self.0 == self.1
    }

    pub fn describe(&self) -> String {
        if self.is_double() {
            format!("Double {}! Move 2 spaces!", self.0)
        } else {
            format!("{} and {} move 1 space each", self.0, self.1)
        }
    }
}

/// Source of die faces
pub trait DiceSource {
    /// Pick one color uniformly from `pool`. None only if the pool is empty.
    fn pick(&mut self, pool: &[Color]) -> Option<Color>;
}

/// Uniform dice backed by a seedable RNG
#[derive(Debug, Clone)]
pub struct RandomDice<R = Pcg32> {
    rng: R,
}

impl RandomDice<Pcg32> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomDice<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceSource for RandomDice<R> {
    fn pick(&mut self, pool: &[Color]) -> Option<Color> {
        if pool.is_empty() {
            return None;
        }
        let i = self.rng.random_range(0..pool.len());
        pool.get(i).copied()
    }
}

/// The dice drawn for one roll action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollPlan {
    /// First draw over all six colors
    pub initial: DicePair,
    /// Second reveal, present when at least one die hit a finished snail.
    /// A die that did not need redrawing keeps its initial face.
    pub reroll: Option<DicePair>,
}

impl RollPlan {
    pub fn needs_reroll(&self) -> bool {
        self.reroll.is_some()
    }

    /// Faces that actually move snails
    pub fn final_pair(&self) -> DicePair {
        self.reroll.unwrap_or(self.initial)
    }
}

/// Draw a roll against the current positions.
///
/// Returns None when no snail is left racing.
pub fn plan_roll<D: DiceSource + ?Sized>(
    dice: &mut D,
    positions: &SnailPositions,
) -> Option<RollPlan> {
    let active = positions.active();
    if active.is_empty() {
        return None;
    }

    let initial = DicePair(dice.pick(&Color::ALL)?, dice.pick(&Color::ALL)?);

    let first_finished = positions.is_finished(initial.0);
    let second_finished = positions.is_finished(initial.1);
    if !first_finished && !second_finished {
        return Some(RollPlan {
            initial,
            reroll: None,
        });
    }

    let first = if first_finished {
        dice.pick(&active)?
    } else {
        initial.0
    };
    let second = if second_finished {
        dice.pick(&active)?
    } else {
        initial.1
    };
    log::debug!(
        "Reroll: {}/{} -> {}/{} (active pool {:?})",
        initial.0,
        initial.1,
        first,
        second,
        active
    );

    Some(RollPlan {
        initial,
        reroll: Some(DicePair(first, second)),
    })
}

/// Dice that replay a fixed script, for tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedDice {
    faces: std::collections::VecDeque<Color>,
    /// Every pool a face was drawn from, in order
    pub pools: Vec<Vec<Color>>,
}

#[cfg(test)]
impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = Color>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            pools: Vec::new(),
        }
    }

    pub fn push(&mut self, faces: impl IntoIterator<Item = Color>) {
        self.faces.extend(faces);
    }
}

#[cfg(test)]
impl DiceSource for ScriptedDice {
    fn pick(&mut self, pool: &[Color]) -> Option<Color> {
        self.pools.push(pool.to_vec());
        let face = self.faces.pop_front()?;
        assert!(pool.contains(&face), "scripted {face} not in pool {pool:?}");
        Some(face)
    }
}
