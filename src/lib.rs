//! Composition-assistance library
//!
//! `baton` layers a selector/command pipeline over a small score model:
//! selectors describe which leaves of a score to target, commands
//! describe what to do to them (pitch assignment, registration,
//! clustering, spanner attachment, tagging), a talea rhythm-maker turns
//! pitch collections into rhythmicized figures, and a segment maker
//! threads persistent state across independent rendering passes and
//! emits LilyPond.

pub mod api;
pub mod commands;
pub mod models;
pub mod renderers;
pub mod rhythm;
pub mod segments;
pub mod select;

// Re-export commonly used types
pub use commands::{Bookend, Command, CommandAction, CommandError, MeasureSpan, Runtime};
pub use models::{
    Clef, CyclicPitches, CyclicTuple, Duration, Indicator, Leaf, LeafKind, NumberedPitch,
    Registration, Score, Tag, TimeSignature, Voice,
};
pub use rhythm::{PitchFirstRhythmMaker, PitchToken, RhythmState, Talea, TimeTreatment};
pub use segments::{CommandScope, SegmentMaker};
pub use select::{Selection, Selector};
