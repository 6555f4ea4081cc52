//! Race result persistence
//!
//! Features:
//! - JSON contract with the race statistics service
//! - Retry with exponential backoff on failed saves
//! - Save status scoped to the current race, with auto-expiring banners

pub mod api;
pub mod gateway;

pub use api::{Ack, HttpBackend, PersistenceError, RaceBackend, RaceResult, StatsResponse};
pub use gateway::{PersistenceGateway, SaveStatus, SaveTracker};
