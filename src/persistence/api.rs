//! Race statistics service contract
//!
//! - `POST {base}/api/races/create/` records one finished race
//! - `GET {base}/api/stats/` returns win counts per color plus `total_races`

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::{Color, RaceOutcome};

/// Failed calls to the statistics service
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with HTTP {status}")]
    Status { status: u16 },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Whatever JSON the service sends back for a created race
pub type Ack = serde_json::Value;

/// Request body for a finished race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub winner_color: Color,
    pub second_place: Color,
    pub last_place: Color,
    pub total_rolls: u32,
}

impl From<&RaceOutcome> for RaceResult {
    fn from(outcome: &RaceOutcome) -> Self {
        Self {
            winner_color: outcome.winner(),
            second_place: outcome.second_place(),
            last_place: outcome.last_place(),
            total_rolls: outcome.total_rolls,
        }
    }
}

/// Raw stats payload: `{ "red": 4, ..., "total_races": 12 }`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub total_races: u64,
    /// Remaining keys, normally one per color
    #[serde(flatten)]
    pub counts: BTreeMap<String, serde_json::Value>,
}

impl StatsResponse {
    /// Wins recorded for `color` (0 when absent or not a count)
    pub fn wins(&self, color: Color) -> u64 {
        self.counts
            .get(color.as_str())
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

/// The remote side of persistence
pub trait RaceBackend {
    fn create_race(
        &self,
        result: &RaceResult,
    ) -> impl Future<Output = Result<Ack, PersistenceError>>;

    fn fetch_stats(&self) -> impl Future<Output = Result<StatsResponse, PersistenceError>>;
}

/// HTTP client for the statistics service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn create_url(&self) -> String {
        format!("{}/api/races/create/", self.base_url)
    }

    pub fn stats_url(&self) -> String {
        format!("{}/api/stats/", self.base_url)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, PersistenceError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(PersistenceError::Status {
            status: status.as_u16(),
        });
    }
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

impl RaceBackend for HttpBackend {
    async fn create_race(&self, result: &RaceResult) -> Result<Ack, PersistenceError> {
        let resp = self.client.post(self.create_url()).json(result).send().await?;
        read_json(resp).await
    }

    async fn fetch_stats(&self) -> Result<StatsResponse, PersistenceError> {
        let resp = self.client.get(self.stats_url()).send().await?;
        read_json(resp).await
    }
}
