//! Talea patterns
//!
//! A talea is a repeating signed-integer rhythmic pattern over a
//! denominator: entry 2 at denominator 16 is two sixteenths of sound,
//! entry -1 one sixteenth of rest. The rhythm-maker addresses a talea by
//! weight: the persisted cursor counts talea units consumed, and entry
//! lookup walks cumulative weights modulo the pattern's total weight, so
//! a later segment resumes exactly where the previous one stopped.

use serde::{Deserialize, Serialize};

use crate::models::Duration;

use super::RhythmError;

/// A cyclic signed rhythmic pattern (negative entries are rests).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Talea {
    counts: Vec<i64>,
    denominator: i64,
}

impl Talea {
    /// Build a talea; counts must be nonzero and the denominator a
    /// positive power of two.
    pub fn new(counts: Vec<i64>, denominator: i64) -> Result<Self, RhythmError> {
        if counts.is_empty() {
            return Err(RhythmError::EmptyTalea);
        }
        if counts.iter().any(|&c| c == 0) {
            return Err(RhythmError::ZeroTaleaEntry);
        }
        if denominator <= 0 || (denominator & (denominator - 1)) != 0 {
            return Err(RhythmError::BadDenominator(denominator));
        }
        Ok(Talea {
            counts,
            denominator,
        })
    }

    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Total weight of one pass through the pattern.
    pub fn total_weight(&self) -> u64 {
        self.counts.iter().map(|c| c.unsigned_abs()).sum()
    }

    /// The entry whose weight span contains the given cursor position.
    pub fn entry_at(&self, cursor: u64) -> i64 {
        let position = cursor % self.total_weight();
        let mut consumed = 0u64;
        for &count in &self.counts {
            consumed += count.unsigned_abs();
            if position < consumed {
                return count;
            }
        }
        // total_weight > 0, so the loop always returns.
        unreachable!()
    }

    /// Duration of one talea unit.
    pub fn unit_duration(&self) -> Duration {
        Duration::new(1, self.denominator)
    }

    /// Duration of an entry (sign dropped).
    pub fn entry_duration(&self, entry: i64) -> Duration {
        Duration::new(entry.abs(), self.denominator)
    }
}
