//! Race controller
//!
//! Owns the race state and paces each roll through its reveal steps:
//!
//! 1. initial dice shown
//! 2. (reroll only) wait, show the rerolled dice
//! 3. wait, move snails and record finishers
//! 4. (last finisher only) wait, flip to Finished
//!
//! Methods take `&self` so the UI can reset or read a snapshot while a roll
//! is waiting on a timer. The state is never borrowed across an await.

use std::cell::RefCell;

use serde::Serialize;

use crate::persistence::{SaveStatus, SaveTracker};
use crate::platform::Sleeper;
use crate::settings::RevealTimings;
use crate::sim::{
    self, Color, DicePair, DiceSource, GamePhase, Predictions, RaceError, RaceOutcome, RaceState,
    RollPlan, RollTicket, SnailPositions,
};

/// How a `roll_dice` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollReport {
    /// Snails moved. `outcome` is set on the roll that ended the race.
    Moved {
        plan: RollPlan,
        outcome: Option<RaceOutcome>,
    },
    /// No snail was left to move
    NothingToMove,
    /// The race was reset while this roll was in flight
    Abandoned,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSnapshot {
    pub race_id: u64,
    pub game_phase: GamePhase,
    pub snail_positions: SnailPositions,
    pub dice_results: Option<DicePair>,
    pub is_rolling: bool,
    pub predictions: Option<Predictions>,
    pub winner: Option<Color>,
    pub loser: Option<Color>,
    pub finish_order: Vec<Color>,
    pub total_rolls: u32,
    pub save_status: SaveStatus,
}

pub struct RaceController<D, S> {
    state: RefCell<RaceState>,
    dice: RefCell<D>,
    sleeper: S,
    timings: RevealTimings,
    saves: SaveTracker,
}

impl<D: DiceSource, S: Sleeper> RaceController<D, S> {
    pub fn new(dice: D, sleeper: S, timings: RevealTimings, saves: SaveTracker) -> Self {
        let state = RaceState::new();
        saves.reset(state.race_id);
        Self {
            state: RefCell::new(state),
            dice: RefCell::new(dice),
            sleeper,
            timings,
            saves,
        }
    }

    pub fn race_id(&self) -> u64 {
        self.state.borrow().race_id
    }

    pub fn phase(&self) -> GamePhase {
        self.state.borrow().phase
    }

    pub fn is_rolling(&self) -> bool {
        self.state.borrow().rolling
    }

    pub fn save_tracker(&self) -> &SaveTracker {
        &self.saves
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        let state = self.state.borrow();
        RaceSnapshot {
            race_id: state.race_id,
            game_phase: state.phase,
            snail_positions: state.positions,
            dice_results: state.dice,
            is_rolling: state.rolling,
            predictions: state.predictions,
            winner: state.winner(),
            loser: state.loser(),
            finish_order: state.finish_order.clone(),
            total_rolls: state.total_rolls,
            save_status: self.saves.status(),
        }
    }

    /// Final result, once the race is over
    pub fn outcome(&self) -> Option<RaceOutcome> {
        let state = self.state.borrow();
        if state.phase == GamePhase::Finished {
            state.outcome()
        } else {
            None
        }
    }

    pub fn submit_predictions(&self, winner: Color, loser: Color) -> Result<(), RaceError> {
        sim::submit_predictions(&mut self.state.borrow_mut(), winner, loser)
    }

    /// Abandon whatever is going on and start over at the prediction phase
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        sim::reset(&mut state);
        self.saves.reset(state.race_id);
    }

    /// Roll the dice and play out the reveal sequence.
    ///
    /// Fails without side effects when not racing or when another roll is
    /// still in flight.
    pub async fn roll_dice(&self) -> Result<RollReport, RaceError> {
        let ticket = {
            let mut state = self.state.borrow_mut();
            let mut dice = self.dice.borrow_mut();
            sim::begin_roll(&mut state, &mut *dice)?
        };
        let Some(ticket) = ticket else {
            return Ok(RollReport::NothingToMove);
        };

        match self.play_out(&ticket).await {
            Ok(outcome) => Ok(RollReport::Moved {
                plan: ticket.plan,
                outcome,
            }),
            Err(RaceError::StaleRoll { roll_race, .. }) => {
                log::debug!("Roll from race {roll_race} abandoned by reset");
                Ok(RollReport::Abandoned)
            }
            Err(err) => Err(err),
        }
    }

    async fn play_out(&self, ticket: &RollTicket) -> Result<Option<RaceOutcome>, RaceError> {
        if ticket.plan.needs_reroll() {
            self.sleeper.sleep(self.timings.reroll_reveal()).await;
            sim::reveal_reroll(&mut self.state.borrow_mut(), ticket)?;
            self.sleeper.sleep(self.timings.after_reroll()).await;
        } else {
            self.sleeper.sleep(self.timings.initial_reveal()).await;
        }

        let update = sim::apply_movement(&mut self.state.borrow_mut(), ticket)?;

        let outcome = if update.complete {
            self.sleeper.sleep(self.timings.finish_settle()).await;
            sim::complete_race(&mut self.state.borrow_mut(), ticket)?
        } else {
            None
        };

        sim::end_roll(&mut self.state.borrow_mut(), ticket)?;
        Ok(outcome)
    }
}
