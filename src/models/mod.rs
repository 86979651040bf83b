//! Models module for the composition library
//!
//! This module contains the score model the selectors and commands
//! operate on: pitches, durations, leaves, indicators, registrations and
//! cyclic payloads.

pub mod cyclic;
pub mod duration;
pub mod indicators;
pub mod pitch;
pub mod registration;
pub mod score;

// Re-export commonly used types
pub use cyclic::{CyclicPitches, CyclicTuple};
pub use duration::Duration;
pub use indicators::{Indicator, Tag, Wrapper};
pub use pitch::{Clef, NumberedPitch, StaffPosition};
pub use registration::{PitchRange, Registration, RegistrationComponent};
pub use score::{Leaf, LeafKind, Score, TimeSignature, TupletSpan, Voice};
