//! Model year to generation code mapping

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive year ranges and the generation code each maps to
const GENERATION_RANGES: [(i32, i32, u8); 5] = [
    (2001, 2002, 1),
    (2003, 2006, 2),
    (2007, 2011, 3),
    (2012, 2017, 4),
    (2018, 2023, 5),
];

/// A resolved generation code (1..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation(u8);

impl Generation {
    /// Map a calendar year; years outside every range have no generation
    pub fn from_year(year: i32) -> Option<Self> {
        GENERATION_RANGES
            .iter()
            .find(|(start, end, _)| (*start..=*end).contains(&year))
            .map(|&(_, _, code)| Generation(code))
    }

    /// Code as stored in the record sources
    pub fn code(self) -> i32 {
        i32::from(self.0)
    }

    /// Whether a record's generation column refers to this generation
    pub fn matches(self, stored: i32) -> bool {
        self.code() == stored
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Generation for an optional year; absent years have no generation
pub fn generation_of(year: Option<i32>) -> Option<Generation> {
    year.and_then(Generation::from_year)
}
