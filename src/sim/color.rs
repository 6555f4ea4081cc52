//! Snail colors
//!
//! Six fixed lanes. The declaration order is the enumeration order used
//! wherever colors are iterated, including the tie-break between snails
//! that cross the finish line on the same roll.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::SNAIL_COUNT;

/// A snail (and the lane it races in)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Yellow,
    Green,
    Orange,
    Purple,
}

impl Color {
    /// Every color, in enumeration order
    pub const ALL: [Color; SNAIL_COUNT] = [
        Color::Red,
        Color::Blue,
        Color::Yellow,
        Color::Green,
        Color::Orange,
        Color::Purple,
    ];

    /// Stable lane index (0-based)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Orange => "orange",
            Color::Purple => "purple",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "red" => Some(Color::Red),
            "blue" => Some(Color::Blue),
            "yellow" => Some(Color::Yellow),
            "green" => Some(Color::Green),
            "orange" => Some(Color::Orange),
            "purple" => Some(Color::Purple),
            _ => None,
        }
    }

    /// Display label, e.g. "Red Snail"
    pub fn snail_name(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{} Snail", first.to_ascii_uppercase(), chars.as_str()),
            None => String::new(),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
