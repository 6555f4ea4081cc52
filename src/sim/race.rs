//! Race transitions
//!
//! The engine is driven by two inputs (predictions submitted, dice rolled)
//! plus an explicit reset. A roll is split into steps so a coordinator can
//! pause between the reveals; `resolve_roll` runs them back to back.

use thiserror::Error;

use super::color::Color;
use super::dice::{DicePair, DiceSource, RollPlan, plan_roll};
use super::state::{GamePhase, Predictions, RaceOutcome, RaceState};
use crate::consts::SNAIL_COUNT;

/// Rejected engine inputs. None of them change the state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    #[error("winner and loser predictions must differ (both {0})")]
    InvalidPrediction(Color),
    #[error("{action} is not allowed during the {phase:?} phase")]
    InvalidPhase {
        action: &'static str,
        phase: GamePhase,
    },
    #[error("a roll is already in progress")]
    RollInProgress,
    #[error("roll belongs to race {roll_race}, current race is {current_race}")]
    StaleRoll { roll_race: u64, current_race: u64 },
}

/// Permission to finish one roll. Issued by `begin_roll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollTicket {
    pub race_id: u64,
    pub plan: RollPlan,
}

/// What movement did to the finish order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishUpdate {
    /// Colors that crossed on this roll, in enumeration order
    pub newly_finished: Vec<Color>,
    /// All six snails have now finished
    pub complete: bool,
}

/// Store the player's picks and start racing
pub fn submit_predictions(
    state: &mut RaceState,
    winner: Color,
    loser: Color,
) -> Result<(), RaceError> {
    if state.phase != GamePhase::Prediction {
        return Err(RaceError::InvalidPhase {
            action: "submitting predictions",
            phase: state.phase,
        });
    }
    if winner == loser {
        return Err(RaceError::InvalidPrediction(winner));
    }

    state.predictions = Some(Predictions { winner, loser });
    state.phase = GamePhase::Racing;
    log::info!("Race {}: predicted winner {winner}, loser {loser}", state.race_id);
    Ok(())
}

/// Start a roll: count it, draw the dice and reveal the initial pair.
///
/// Returns `Ok(None)` when every snail has already finished.
pub fn begin_roll<D: DiceSource + ?Sized>(
    state: &mut RaceState,
    dice: &mut D,
) -> Result<Option<RollTicket>, RaceError> {
    if state.phase != GamePhase::Racing {
        return Err(RaceError::InvalidPhase {
            action: "rolling",
            phase: state.phase,
        });
    }
    if state.rolling {
        return Err(RaceError::RollInProgress);
    }

    // Unreachable while the phase invariant holds: Racing ends once all six finish.
    let Some(plan) = plan_roll(dice, &state.positions) else {
        log::warn!("Race {}: roll requested with no active snails", state.race_id);
        return Ok(None);
    };

    state.total_rolls += 1;
    state.rolling = true;
    state.dice = Some(plan.initial);
    log::debug!(
        "Race {} roll {}: {}",
        state.race_id,
        state.total_rolls,
        plan.initial.describe()
    );

    Ok(Some(RollTicket {
        race_id: state.race_id,
        plan,
    }))
}

fn check_ticket(state: &RaceState, ticket: &RollTicket) -> Result<(), RaceError> {
    if ticket.race_id != state.race_id {
        return Err(RaceError::StaleRoll {
            roll_race: ticket.race_id,
            current_race: state.race_id,
        });
    }
    Ok(())
}

/// Show the rerolled dice (no-op when the roll had no reroll)
pub fn reveal_reroll(state: &mut RaceState, ticket: &RollTicket) -> Result<(), RaceError> {
    check_ticket(state, ticket)?;
    if let Some(reroll) = ticket.plan.reroll {
        log::debug!("Race {}: reroll {}", state.race_id, reroll.describe());
        state.dice = Some(reroll);
    }
    Ok(())
}

/// Move snails by the final dice, then record any new finishers
pub fn apply_movement(
    state: &mut RaceState,
    ticket: &RollTicket,
) -> Result<FinishUpdate, RaceError> {
    check_ticket(state, ticket)?;

    let pair = ticket.plan.final_pair();
    state.dice = Some(pair);
    move_snails(state, pair);
    Ok(derive_finish_order(state))
}

fn move_snails(state: &mut RaceState, pair: DicePair) {
    let DicePair(first, second) = pair;
    if pair.is_double() {
        state.positions.advance(first, 2);
    } else {
        state.positions.advance(first, 1);
        state.positions.advance(second, 1);
    }
}

/// Append snails that reached the finish line since the last call.
///
/// Idempotent for unchanged positions. Never removes or reorders entries.
pub fn derive_finish_order(state: &mut RaceState) -> FinishUpdate {
    let newly_finished: Vec<Color> = state
        .positions
        .finished()
        .into_iter()
        .filter(|c| !state.finish_order.contains(c))
        .collect();

    if !newly_finished.is_empty() {
        if state.finish_order.is_empty() {
            log::info!("Race {}: {} wins", state.race_id, newly_finished[0]);
        }
        state.finish_order.extend_from_slice(&newly_finished);
        log::debug!(
            "Race {}: finish order {:?}",
            state.race_id,
            state.finish_order
        );
    }

    FinishUpdate {
        newly_finished,
        complete: state.finish_order.len() == SNAIL_COUNT,
    }
}

/// Flip to Finished once all six have crossed.
///
/// Returns the outcome only on the call that makes the transition.
pub fn complete_race(
    state: &mut RaceState,
    ticket: &RollTicket,
) -> Result<Option<RaceOutcome>, RaceError> {
    check_ticket(state, ticket)?;
    if state.phase != GamePhase::Racing || !state.is_complete() {
        return Ok(None);
    }

    state.phase = GamePhase::Finished;
    let outcome = state.outcome();
    if let Some(outcome) = &outcome {
        log::info!(
            "Race {} finished after {} rolls: winner {}, last {}",
            state.race_id,
            outcome.total_rolls,
            outcome.winner(),
            outcome.last_place()
        );
    }
    Ok(outcome)
}

/// Release the roll slot
pub fn end_roll(state: &mut RaceState, ticket: &RollTicket) -> Result<(), RaceError> {
    check_ticket(state, ticket)?;
    state.rolling = false;
    Ok(())
}

/// Run a whole roll without pauses.
///
/// Returns `Ok(None)` for the defensive no-snails-left case, otherwise the
/// ticket that was played and the outcome if this roll ended the race.
pub fn resolve_roll<D: DiceSource + ?Sized>(
    state: &mut RaceState,
    dice: &mut D,
) -> Result<Option<(RollTicket, Option<RaceOutcome>)>, RaceError> {
    let Some(ticket) = begin_roll(state, dice)? else {
        return Ok(None);
    };
    reveal_reroll(state, &ticket)?;
    let update = apply_movement(state, &ticket)?;
    let outcome = if update.complete {
        complete_race(state, &ticket)?
    } else {
        None
    };
    end_roll(state, &ticket)?;
    Ok(Some((ticket, outcome)))
}

/// Start a new race. Every field returns to its initial value.
pub fn reset(state: &mut RaceState) {
    let race_id = state.race_id.wrapping_add(1);
    *state = RaceState {
        race_id,
        ..RaceState::default()
    };
    log::info!("Race {race_id}: new race");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FINISH_POSITION;
    use crate::sim::dice::{RandomDice, ScriptedDice};
    use proptest::prelude::*;

    fn racing() -> RaceState {
        let mut state = RaceState::new();
        submit_predictions(&mut state, Color::Red, Color::Blue).unwrap();
        state
    }

    #[test]
    fn test_submit_predictions_starts_race() {
        let state = racing();
        assert_eq!(state.phase, GamePhase::Racing);
        assert_eq!(
            state.predictions,
            Some(Predictions {
                winner: Color::Red,
                loser: Color::Blue
            })
        );
        for color in Color::ALL {
            assert_eq!(state.positions.get(color), 0);
        }
    }

    #[test]
    fn test_identical_predictions_rejected() {
        let mut state = RaceState::new();
        let err = submit_predictions(&mut state, Color::Green, Color::Green).unwrap_err();
        assert_eq!(err, RaceError::InvalidPrediction(Color::Green));
        assert_eq!(state.phase, GamePhase::Prediction);
        assert!(state.predictions.is_none());
    }

    #[test]
    fn test_predictions_only_once() {
        let mut state = racing();
        let err = submit_predictions(&mut state, Color::Yellow, Color::Orange).unwrap_err();
        assert!(matches!(err, RaceError::InvalidPhase { .. }));
        assert_eq!(state.predictions.unwrap().winner, Color::Red);
    }

    #[test]
    fn test_roll_before_predictions_is_rejected() {
        let mut state = RaceState::new();
        let mut dice = ScriptedDice::new([Color::Red, Color::Red]);
        let err = begin_roll(&mut state, &mut dice).unwrap_err();
        assert!(matches!(err, RaceError::InvalidPhase { .. }));
        assert_eq!(state.total_rolls, 0);
        assert!(state.dice.is_none());
    }

    #[test]
    fn test_double_moves_two() {
        let mut state = racing();
        let mut dice = ScriptedDice::new([Color::Red, Color::Red]);
        resolve_roll(&mut state, &mut dice).unwrap();

        assert_eq!(state.positions.get(Color::Red), 2);
        assert_eq!(state.total_rolls, 1);
        assert_eq!(state.dice, Some(DicePair(Color::Red, Color::Red)));
        for color in Color::ALL.into_iter().filter(|c| *c != Color::Red) {
            assert_eq!(state.positions.get(color), 0);
        }
        assert!(!state.rolling);
    }

    #[test]
    fn test_distinct_dice_move_one_each() {
        let mut state = racing();
        let mut dice = ScriptedDice::new([Color::Red, Color::Blue]);
        resolve_roll(&mut state, &mut dice).unwrap();
        assert_eq!(state.positions.get(Color::Red), 1);
        assert_eq!(state.positions.get(Color::Blue), 1);
        assert_eq!(state.positions.get(Color::Green), 0);
    }

    #[test]
    fn test_second_roll_rejected_while_in_flight() {
        let mut state = racing();
        let mut dice = ScriptedDice::new([Color::Red, Color::Blue, Color::Green, Color::Green]);
        let ticket = begin_roll(&mut state, &mut dice).unwrap().unwrap();
        assert_eq!(
            begin_roll(&mut state, &mut dice).unwrap_err(),
            RaceError::RollInProgress
        );
        assert_eq!(state.total_rolls, 1);

        apply_movement(&mut state, &ticket).unwrap();
        end_roll(&mut state, &ticket).unwrap();
        assert!(begin_roll(&mut state, &mut dice).unwrap().is_some());
    }

    #[test]
    fn test_finished_die_rerolled_before_movement() {
        let mut state = racing();
        state.positions.set(Color::Red, FINISH_POSITION);
        derive_finish_order(&mut state);

        let mut dice = ScriptedDice::new([Color::Red, Color::Blue, Color::Yellow]);
        let ticket = begin_roll(&mut state, &mut dice).unwrap().unwrap();
        // The initial roll is revealed as drawn, finished color included
        assert_eq!(state.dice, Some(DicePair(Color::Red, Color::Blue)));

        reveal_reroll(&mut state, &ticket).unwrap();
        assert_eq!(state.dice, Some(DicePair(Color::Yellow, Color::Blue)));
        assert_eq!(state.positions.get(Color::Yellow), 0);

        apply_movement(&mut state, &ticket).unwrap();
        assert_eq!(state.positions.get(Color::Yellow), 1);
        assert_eq!(state.positions.get(Color::Blue), 1);
        assert_eq!(state.positions.get(Color::Red), FINISH_POSITION);
        assert_eq!(dice.pools[2], state.positions.active());
    }

    #[test]
    fn test_simultaneous_finishers_use_enumeration_order() {
        let mut state = racing();
        state.positions.set(Color::Purple, FINISH_POSITION - 1);
        state.positions.set(Color::Blue, FINISH_POSITION - 1);

        let mut dice = ScriptedDice::new([Color::Purple, Color::Blue]);
        resolve_roll(&mut state, &mut dice).unwrap();
        assert_eq!(state.finish_order, vec![Color::Blue, Color::Purple]);
        assert_eq!(state.winner(), Some(Color::Blue));
    }

    #[test]
    fn test_derive_is_idempotent() {
        let mut state = racing();
        state.positions.set(Color::Green, FINISH_POSITION);
        let first = derive_finish_order(&mut state);
        assert_eq!(first.newly_finished, vec![Color::Green]);

        let before = state.finish_order.clone();
        let second = derive_finish_order(&mut state);
        assert!(second.newly_finished.is_empty());
        assert_eq!(state.finish_order, before);
    }

    #[test]
    fn test_last_finisher_ends_race() {
        let mut state = racing();
        let order = [
            Color::Orange,
            Color::Red,
            Color::Green,
            Color::Yellow,
            Color::Purple,
        ];
        for color in order {
            state.positions.set(color, FINISH_POSITION);
            derive_finish_order(&mut state);
        }
        state.positions.set(Color::Blue, FINISH_POSITION - 1);
        state.total_rolls = 30;

        // Blue is the only active snail: both dice get redrawn from [blue]
        let mut dice = ScriptedDice::new([Color::Red, Color::Orange, Color::Blue, Color::Blue]);
        let (ticket, outcome) = resolve_roll(&mut state, &mut dice).unwrap().unwrap();
        assert_eq!(ticket.plan.final_pair(), DicePair(Color::Blue, Color::Blue));

        let outcome = outcome.expect("race should be over");
        assert_eq!(state.phase, GamePhase::Finished);
        assert_eq!(state.finish_order.len(), SNAIL_COUNT);
        assert_eq!(state.loser(), Some(Color::Blue));
        assert_eq!(outcome.winner(), Color::Orange);
        assert_eq!(outcome.second_place(), Color::Red);
        assert_eq!(outcome.last_place(), Color::Blue);
        assert_eq!(outcome.total_rolls, 31);
        assert_eq!(state.positions.get(Color::Blue), FINISH_POSITION);

        let err = begin_roll(&mut state, &mut dice).unwrap_err();
        assert!(matches!(err, RaceError::InvalidPhase { .. }));
    }

    #[test]
    fn test_complete_race_reports_once() {
        let mut state = racing();
        for color in Color::ALL {
            state.positions.set(color, FINISH_POSITION);
        }
        derive_finish_order(&mut state);
        let ticket = RollTicket {
            race_id: state.race_id,
            plan: RollPlan {
                initial: DicePair(Color::Red, Color::Red),
                reroll: None,
            },
        };
        assert!(complete_race(&mut state, &ticket).unwrap().is_some());
        assert!(complete_race(&mut state, &ticket).unwrap().is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = racing();
        let mut dice = ScriptedDice::new([Color::Red, Color::Red, Color::Blue, Color::Blue]);
        resolve_roll(&mut state, &mut dice).unwrap();
        // Leave a second roll in flight
        begin_roll(&mut state, &mut dice).unwrap().unwrap();
        assert!(state.rolling);

        let old_id = state.race_id;
        reset(&mut state);
        assert_eq!(state.race_id, old_id + 1);
        assert_eq!(state.phase, GamePhase::Prediction);
        assert!(state.predictions.is_none());
        assert!(state.dice.is_none());
        assert!(state.finish_order.is_empty());
        assert_eq!(state.total_rolls, 0);
        assert!(!state.rolling);
        assert_eq!(state.positions.get(Color::Red), 0);
    }

    #[test]
    fn test_stale_ticket_cannot_write() {
        let mut state = racing();
        let mut dice = ScriptedDice::new([Color::Red, Color::Red]);
        let ticket = begin_roll(&mut state, &mut dice).unwrap().unwrap();
        reset(&mut state);

        assert!(matches!(
            apply_movement(&mut state, &ticket),
            Err(RaceError::StaleRoll { .. })
        ));
        assert_eq!(state.positions.get(Color::Red), 0);
        assert!(state.dice.is_none());
    }

    /// Play a seeded race to the end, checking invariants after every roll
    fn play_out(seed: u64) -> Result<RaceState, TestCaseError> {
        let mut state = racing();
        let mut dice = RandomDice::seeded(seed);
        let mut last_positions = state.positions;
        let mut last_len = 0;

        for _ in 0..1000 {
            if state.phase == GamePhase::Finished {
                break;
            }
            resolve_roll(&mut state, &mut dice)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            for color in Color::ALL {
                let pos = state.positions.get(color);
                prop_assert!(pos <= FINISH_POSITION);
                prop_assert!(pos >= last_positions.get(color));
                prop_assert_eq!(
                    state.finish_order.contains(&color),
                    pos == FINISH_POSITION
                );
            }
            prop_assert!(state.finish_order.len() >= last_len);
            prop_assert_eq!(state.winner(), state.finish_order.first().copied());
            prop_assert_eq!(
                state.phase == GamePhase::Finished,
                state.finish_order.len() == SNAIL_COUNT
            );
            prop_assert_eq!(state.loser().is_some(), state.finish_order.len() == SNAIL_COUNT);

            last_positions = state.positions;
            last_len = state.finish_order.len();
        }
        Ok(state)
    }

    proptest! {
        #[test]
        fn seeded_races_keep_invariants(seed in any::<u64>()) {
            let state = play_out(seed)?;
            prop_assert_eq!(state.phase, GamePhase::Finished);

            let mut seen = state.finish_order.clone();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), SNAIL_COUNT);
        }
    }
}
