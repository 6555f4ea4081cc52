//! Persistence gateway
//!
//! Records finished races through the retry policy and keeps the save
//! status the UI shows. Runs beside the race: it only ever reads the
//! outcome snapshot it was handed.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::api::{Ack, PersistenceError, RaceBackend, RaceResult};
use crate::platform::Sleeper;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::settings::{NoticeDurations, Settings};
use crate::sim::RaceOutcome;
use crate::stats::RaceStats;

/// Progress of the current race's save
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Succeeded,
    Failed { reason: String },
}

impl SaveStatus {
    /// A finished save whose banner is still showing
    pub fn is_settled(&self) -> bool {
        matches!(self, SaveStatus::Succeeded | SaveStatus::Failed { .. })
    }
}

#[derive(Debug, Default)]
struct TrackerInner {
    race_id: u64,
    status: SaveStatus,
    stats_revision: u64,
}

/// Shared save status, scoped to one race at a time.
///
/// Writes tagged with another race's id are dropped, so a save that
/// outlives a reset can't touch the new race's banner.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    inner: Rc<RefCell<TrackerInner>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.borrow().status.clone()
    }

    /// Bumped after every successful save; watchers refetch stats on change
    pub fn stats_revision(&self) -> u64 {
        self.inner.borrow().stats_revision
    }

    /// Switch to a new race with an idle status
    pub fn reset(&self, race_id: u64) {
        let mut inner = self.inner.borrow_mut();
        inner.race_id = race_id;
        inner.status = SaveStatus::Idle;
    }

    fn update(&self, race_id: u64, status: SaveStatus) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.race_id != race_id {
            log::debug!("Dropping save status for old race {race_id}");
            return false;
        }
        inner.status = status;
        true
    }

    /// Hide a settled banner
    fn expire(&self, race_id: u64) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.race_id != race_id || !inner.status.is_settled() {
            return false;
        }
        inner.status = SaveStatus::Idle;
        true
    }

    fn bump_stats(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.stats_revision = inner.stats_revision.wrapping_add(1);
    }
}

/// Saves race results and reads back statistics
pub struct PersistenceGateway<B, S> {
    backend: B,
    sleeper: S,
    policy: RetryPolicy,
    notices: NoticeDurations,
    tracker: SaveTracker,
}

impl<B: RaceBackend, S: Sleeper> PersistenceGateway<B, S> {
    pub fn new(backend: B, sleeper: S, settings: &Settings, tracker: SaveTracker) -> Self {
        Self {
            backend,
            sleeper,
            policy: settings.retry,
            notices: settings.notices,
            tracker,
        }
    }

    pub fn tracker(&self) -> &SaveTracker {
        &self.tracker
    }

    /// Send one finished race to the service, retrying per policy
    pub async fn save_race_result(
        &self,
        race_id: u64,
        outcome: &RaceOutcome,
    ) -> Result<Ack, PersistenceError> {
        let body = RaceResult::from(outcome);
        self.tracker.update(race_id, SaveStatus::Saving);
        log::info!(
            "Saving race {race_id}: winner {}, second {}, last {}, {} rolls",
            body.winner_color,
            body.second_place,
            body.last_place,
            body.total_rolls
        );

        let result = retry_with_backoff(&self.policy, &self.sleeper, |attempt| {
            log::debug!("Save race {race_id}, attempt {}", attempt + 1);
            self.backend.create_race(&body)
        })
        .await;

        match &result {
            Ok(_) => {
                log::info!("Race {race_id} saved");
                self.tracker.update(race_id, SaveStatus::Succeeded);
                self.tracker.bump_stats();
            }
            Err(err) => {
                log::error!("Failed to save race {race_id}: {err}");
                self.tracker.update(
                    race_id,
                    SaveStatus::Failed {
                        reason: err.to_string(),
                    },
                );
            }
        }
        result
    }

    /// Save, then keep the result banner up for its notice period.
    ///
    /// Intended to be spawned when a race finishes; never fails.
    pub async fn record(&self, race_id: u64, outcome: RaceOutcome) {
        let linger = match self.save_race_result(race_id, &outcome).await {
            Ok(_) => self.notices.success(),
            Err(_) => self.notices.failure(),
        };
        self.sleeper.sleep(linger).await;
        self.tracker.expire(race_id);
    }

    pub async fn fetch_stats(&self) -> Result<RaceStats, PersistenceError> {
        let resp = self.backend.fetch_stats().await?;
        log::debug!("Fetched stats: {} races", resp.total_races);
        Ok(RaceStats::from(&resp))
    }
}
