//! Registration tables
//!
//! A registration maps source pitch ranges to target octaves: a matched
//! pitch keeps its pitch class and is moved into the octave that starts
//! at the component's target origin. Ranges are checked in order and the
//! first match wins; gaps and overlaps are the composer's responsibility.

use serde::{Deserialize, Serialize};

use super::pitch::NumberedPitch;

/// An inclusive pitch range.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PitchRange {
    pub start: NumberedPitch,
    pub stop: NumberedPitch,
}

impl PitchRange {
    pub fn new(start: i64, stop: i64) -> Self {
        PitchRange {
            start: NumberedPitch(start),
            stop: NumberedPitch(stop),
        }
    }

    pub fn contains(&self, pitch: NumberedPitch) -> bool {
        self.start <= pitch && pitch <= self.stop
    }
}

/// One source-range → target-octave pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationComponent {
    pub source: PitchRange,
    /// First pitch of the target octave.
    pub target_origin: NumberedPitch,
}

/// An ordered list of registration components.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Registration {
    pub components: Vec<RegistrationComponent>,
}

impl Registration {
    pub fn new(components: Vec<RegistrationComponent>) -> Self {
        Registration { components }
    }

    /// A one-component registration covering the whole usable range,
    /// as built on the fly by the interpolation commands.
    pub fn single(target_origin: NumberedPitch) -> Self {
        Registration {
            components: vec![RegistrationComponent {
                source: PitchRange::new(-48, 48),
                target_origin,
            }],
        }
    }

    /// Move `pitch` into the target octave of the first component whose
    /// source range contains it. Unmatched pitches pass through `None`.
    pub fn register(&self, pitch: NumberedPitch) -> Option<NumberedPitch> {
        let component = self.components.iter().find(|c| c.source.contains(pitch))?;
        let origin = component.target_origin;
        let step = (pitch.pitch_class() - origin.pitch_class()).rem_euclid(12);
        Some(NumberedPitch(origin.0 + step))
    }
}
