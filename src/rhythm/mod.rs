//! Talea-driven rhythm generation
//!
//! This module turns pitch collections into rhythmicized figures: the
//! talea supplies the repeating duration pattern, the maker pairs
//! pitches with talea entries, and time treatments reshape each figure
//! into a tuplet or an accelerando/ritardando schedule.

pub mod maker;
pub mod talea;
pub mod treatments;

pub use maker::{Figure, PitchFirstRhythmMaker, PitchToken, RhythmState};
pub use talea::Talea;
pub use treatments::{fix_rounding_error, TimeTreatment};

use thiserror::Error;

use crate::models::Duration;

/// Rhythm-maker configuration errors, raised eagerly.
#[derive(Debug, Clone, Error)]
pub enum RhythmError {
    #[error("talea counts must be non-empty")]
    EmptyTalea,

    #[error("talea counts must be nonzero")]
    ZeroTaleaEntry,

    #[error("talea denominator must be a positive power of two, got {0}")]
    BadDenominator(i64),

    #[error("tuplet ratio terms must be positive, got {0}:{1}")]
    BadRatio(i64, i64),

    #[error("target duration must be positive, got {0}")]
    BadTargetDuration(Duration),
}
