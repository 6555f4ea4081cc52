//! Aggregate race statistics
//!
//! Built from the stats endpoint after every successful save.

use serde::Serialize;

use crate::consts::SNAIL_COUNT;
use crate::persistence::StatsResponse;
use crate::sim::Color;

/// One row of the wins-by-color breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorShare {
    pub color: Color,
    pub wins: u64,
    /// Share of all races won, 0-100
    pub percentage: f64,
}

impl ColorShare {
    /// Percentage with one decimal, e.g. "33.3"
    pub fn percentage_label(&self) -> String {
        format!("{:.1}", self.percentage)
    }
}

/// Win counts across all recorded races
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceStats {
    wins: [u64; SNAIL_COUNT],
    pub total_races: u64,
}

/// Display-ready statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_races: u64,
    pub max_wins: u64,
    pub top_colors: Vec<Color>,
    pub breakdown: Vec<ColorShare>,
}

impl From<&StatsResponse> for RaceStats {
    fn from(resp: &StatsResponse) -> Self {
        let mut wins = [0; SNAIL_COUNT];
        for color in Color::ALL {
            wins[color.index()] = resp.wins(color);
        }
        Self {
            wins,
            total_races: resp.total_races,
        }
    }
}

impl RaceStats {
    pub fn wins(&self, color: Color) -> u64 {
        self.wins[color.index()]
    }

    /// No races recorded yet
    pub fn is_empty(&self) -> bool {
        self.total_races == 0
    }

    pub fn max_wins(&self) -> u64 {
        self.wins.iter().copied().max().unwrap_or(0)
    }

    /// Color(s) with the most wins; empty until someone has won
    pub fn top_colors(&self) -> Vec<Color> {
        let max = self.max_wins();
        if max == 0 {
            return Vec::new();
        }
        Color::ALL
            .into_iter()
            .filter(|c| self.wins(*c) == max)
            .collect()
    }

    pub fn win_percentage(&self, color: Color) -> f64 {
        if self.total_races == 0 {
            return 0.0;
        }
        self.wins(color) as f64 / self.total_races as f64 * 100.0
    }

    /// All colors, most wins first (enumeration order breaks ties)
    pub fn breakdown(&self) -> Vec<ColorShare> {
        let mut rows: Vec<ColorShare> = Color::ALL
            .into_iter()
            .map(|color| ColorShare {
                color,
                wins: self.wins(color),
                percentage: self.win_percentage(color),
            })
            .collect();
        rows.sort_by(|a, b| b.wins.cmp(&a.wins));
        rows
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            total_races: self.total_races,
            max_wins: self.max_wins(),
            top_colors: self.top_colors(),
            breakdown: self.breakdown(),
        }
    }
}
