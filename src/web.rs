//! Browser bindings
//!
//! Exposes the race to a JavaScript UI. Inputs are `submitPredictions`,
//! `rollDice` and `reset`; the UI re-renders from `snapshot()` (JSON).

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::controller::{RaceController, RollReport};
use crate::persistence::{HttpBackend, PersistenceGateway, SaveTracker};
use crate::platform::BrowserSleeper;
use crate::settings::Settings;
use crate::sim::{Color, RandomDice};

type WebController = RaceController<RandomDice, BrowserSleeper>;
type WebGateway = PersistenceGateway<HttpBackend, BrowserSleeper>;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Already initialized by an earlier module instance
        return;
    }
    log::info!("Snail Race starting...");
}

fn parse_color(name: &str) -> Result<Color, JsError> {
    Color::from_str(name).ok_or_else(|| JsError::new(&format!("unknown snail color {name:?}")))
}

fn snapshot_json(controller: &WebController) -> Result<JsValue, JsValue> {
    serde_json::to_string(&controller.snapshot())
        .map(|json| JsValue::from_str(&json))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// One race session in the page
#[wasm_bindgen]
pub struct WebRace {
    controller: Rc<WebController>,
    gateway: Rc<WebGateway>,
}

impl Default for WebRace {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WebRace {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebRace {
        let settings = Settings::load();
        let seed = settings.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let tracker = SaveTracker::new();

        let controller = RaceController::new(
            RandomDice::seeded(seed),
            BrowserSleeper,
            settings.timings,
            tracker.clone(),
        );
        let gateway = PersistenceGateway::new(
            HttpBackend::new(&settings.api_base_url),
            BrowserSleeper,
            &settings,
            tracker,
        );

        WebRace {
            controller: Rc::new(controller),
            gateway: Rc::new(gateway),
        }
    }

    #[wasm_bindgen(js_name = submitPredictions)]
    pub fn submit_predictions(&self, winner: &str, loser: &str) -> Result<(), JsError> {
        let winner = parse_color(winner)?;
        let loser = parse_color(loser)?;
        self.controller.submit_predictions(winner, loser)?;
        Ok(())
    }

    /// Resolves with the snapshot JSON once the roll's reveal sequence ends.
    /// A finishing roll also starts the save in the background.
    #[wasm_bindgen(js_name = rollDice)]
    pub fn roll_dice(&self) -> js_sys::Promise {
        let controller = self.controller.clone();
        let gateway = self.gateway.clone();
        future_to_promise(async move {
            let report = controller
                .roll_dice()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;

            if let RollReport::Moved {
                outcome: Some(outcome),
                ..
            } = report
            {
                let race_id = controller.race_id();
                spawn_local(async move { gateway.record(race_id, outcome).await });
            }
            snapshot_json(&controller)
        })
    }

    pub fn reset(&self) {
        self.controller.reset();
    }

    /// Current state as JSON
    pub fn snapshot(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.controller.snapshot())?)
    }

    /// Changes after every successful save; refetch stats when it does
    #[wasm_bindgen(js_name = statsRevision)]
    pub fn stats_revision(&self) -> u32 {
        self.controller.save_tracker().stats_revision() as u32
    }

    /// Resolves with the statistics summary as JSON
    #[wasm_bindgen(js_name = fetchStats)]
    pub fn fetch_stats(&self) -> js_sys::Promise {
        let gateway = self.gateway.clone();
        future_to_promise(async move {
            let stats = gateway
                .fetch_stats()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            serde_json::to_string(&stats.summary())
                .map(|json| JsValue::from_str(&json))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }
}
