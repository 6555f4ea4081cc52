//! Runtime configuration
//!
//! Native builds read overrides from the environment; browser builds take
//! `API_BASE_URL` from the build environment (like a bundler would).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_API_BASE_URL;
use crate::retry::RetryPolicy;

/// Pauses in the roll pipeline (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTimings {
    /// Initial roll shown, no reroll needed: wait before moving
    pub initial_reveal_ms: u64,
    /// Initial roll shown, reroll needed: wait before revealing the reroll
    pub reroll_reveal_ms: u64,
    /// Reroll shown: wait before moving
    pub after_reroll_ms: u64,
    /// Sixth finisher recorded: wait before flipping to Finished
    pub finish_settle_ms: u64,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            initial_reveal_ms: 500,
            reroll_reveal_ms: 1200,
            after_reroll_ms: 500,
            finish_settle_ms: 200,
        }
    }
}

impl RevealTimings {
    pub fn initial_reveal(&self) -> Duration {
        Duration::from_millis(self.initial_reveal_ms)
    }

    pub fn reroll_reveal(&self) -> Duration {
        Duration::from_millis(self.reroll_reveal_ms)
    }

    pub fn after_reroll(&self) -> Duration {
        Duration::from_millis(self.after_reroll_ms)
    }

    pub fn finish_settle(&self) -> Duration {
        Duration::from_millis(self.finish_settle_ms)
    }
}

/// How long save banners stay up (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeDurations {
    pub success_ms: u64,
    pub failure_ms: u64,
}

impl Default for NoticeDurations {
    fn default() -> Self {
        Self {
            success_ms: 3000,
            failure_ms: 5000,
        }
    }
}

impl NoticeDurations {
    pub fn success(&self) -> Duration {
        Duration::from_millis(self.success_ms)
    }

    pub fn failure(&self) -> Duration {
        Duration::from_millis(self.failure_ms)
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Race statistics service, without trailing slash
    pub api_base_url: String,
    /// Fixed dice seed (None = random per session)
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub timings: RevealTimings,
    #[serde(default)]
    pub notices: NoticeDurations,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            seed: None,
            retry: RetryPolicy::default(),
            timings: RevealTimings::default(),
            notices: NoticeDurations::default(),
        }
    }
}

impl Settings {
    /// Environment variable naming the statistics service
    pub const API_BASE_URL_VAR: &'static str = "API_BASE_URL";
    /// Environment variable fixing the dice seed
    pub const SEED_VAR: &'static str = "SNAIL_RACE_SEED";

    /// Apply overrides from a variable lookup. Blank values are ignored,
    /// as are seeds that don't parse.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(Self::API_BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(Self::SEED_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("Ignoring unparseable {}={raw:?}", Self::SEED_VAR),
            }
        }
        self
    }

    /// Seed to use for this session
    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Load settings from the process environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let settings = Self::default().with_overrides(|key| std::env::var(key).ok());
        log::info!("Using race service at {}", settings.api_base_url);
        settings
    }

    /// Load settings baked in at build time
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let settings = Self::default().with_overrides(|key| match key {
            Self::API_BASE_URL_VAR => option_env!("API_BASE_URL").map(str::to_string),
            _ => None,
        });
        log::info!("Using race service at {}", settings.api_base_url);
        settings
    }
}
