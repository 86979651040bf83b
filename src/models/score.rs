//! Core score structures
//!
//! The score is a shallow tree: a `Score` owns named `Voice`s, each voice
//! owns a flat vector of `Leaf`s. Tuplets are index spans over a voice's
//! leaves, so selections and commands can address leaves by plain index
//! and evaluation never aliases mutable references into the tree.

use serde::{Deserialize, Serialize};

use super::duration::Duration;
use super::indicators::{Indicator, Tag, Wrapper};
use super::pitch::NumberedPitch;

/// Type of musical element a leaf represents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Note,
    Chord,
    Rest,
    Skip,
}

/// One leaf of the score: a note, chord, rest or skip.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Leaf {
    pub kind: LeafKind,

    /// Written pitches; one entry for a note, several for a chord,
    /// empty for rests and skips.
    pub pitches: Vec<NumberedPitch>,

    /// Written duration (whole-note units).
    pub duration: Duration,

    /// Tie to the following leaf.
    #[serde(default)]
    pub tie: bool,

    /// Attached indicators.
    #[serde(default)]
    pub wrappers: Vec<Wrapper>,
}

impl Leaf {
    pub fn note(pitch: NumberedPitch, duration: Duration) -> Self {
        Leaf {
            kind: LeafKind::Note,
            pitches: vec![pitch],
            duration,
            tie: false,
            wrappers: Vec::new(),
        }
    }

    pub fn chord(pitches: Vec<NumberedPitch>, duration: Duration) -> Self {
        Leaf {
            kind: LeafKind::Chord,
            pitches,
            duration,
            tie: false,
            wrappers: Vec::new(),
        }
    }

    pub fn rest(duration: Duration) -> Self {
        Leaf {
            kind: LeafKind::Rest,
            pitches: Vec::new(),
            duration,
            tie: false,
            wrappers: Vec::new(),
        }
    }

    pub fn skip(duration: Duration) -> Self {
        Leaf {
            kind: LeafKind::Skip,
            pitches: Vec::new(),
            duration,
            tie: false,
            wrappers: Vec::new(),
        }
    }

    pub fn is_pitched(&self) -> bool {
        matches!(self.kind, LeafKind::Note | LeafKind::Chord)
    }

    /// Attach an indicator with tags.
    pub fn attach(&mut self, indicator: Indicator, tags: Vec<Tag>, deactivate: bool) {
        self.wrappers.push(Wrapper {
            indicator,
            tags,
            deactivate,
        });
    }

    /// Whether an identical active indicator is already attached.
    pub fn has_indicator(&self, indicator: &Indicator) -> bool {
        self.wrappers
            .iter()
            .any(|w| !w.deactivate && &w.indicator == indicator)
    }

    /// Wrappers carrying the given tag.
    pub fn wrappers_tagged<'a>(&'a self, tag: &'a Tag) -> impl Iterator<Item = &'a Wrapper> {
        self.wrappers.iter().filter(move |w| w.has_tag(tag))
    }

    /// Remove all wrappers matching the predicate, returning the count.
    pub fn detach_where<F: FnMut(&Wrapper) -> bool>(&mut self, mut pred: F) -> usize {
        let before = self.wrappers.len();
        self.wrappers.retain(|w| !pred(w));
        before - self.wrappers.len()
    }
}

/// A tuplet: an index span over a voice's leaves with a duration
/// multiplier. Spans do not nest and do not affect leaf indexing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TupletSpan {
    /// First leaf index (inclusive).
    pub start: usize,
    /// Last leaf index (inclusive).
    pub end: usize,
    /// Written-to-sounding multiplier, e.g. 2/3 for a triplet.
    pub multiplier: Duration,
}

impl TupletSpan {
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

/// A named sequence of leaves.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Voice {
    pub name: String,
    pub leaves: Vec<Leaf>,
    pub tuplets: Vec<TupletSpan>,
}

impl Voice {
    pub fn new(name: &str) -> Self {
        Voice {
            name: name.to_string(),
            leaves: Vec::new(),
            tuplets: Vec::new(),
        }
    }

    pub fn add_leaf(&mut self, leaf: Leaf) {
        self.leaves.push(leaf);
    }

    /// Append leaves as a tuplet span with the given multiplier.
    pub fn add_tuplet(&mut self, leaves: Vec<Leaf>, multiplier: Duration) {
        if leaves.is_empty() {
            return;
        }
        let start = self.leaves.len();
        let end = start + leaves.len() - 1;
        self.leaves.extend(leaves);
        self.tuplets.push(TupletSpan {
            start,
            end,
            multiplier,
        });
    }

    /// Tuplet span covering the given leaf, if any.
    pub fn tuplet_at(&self, index: usize) -> Option<&TupletSpan> {
        self.tuplets.iter().find(|t| t.contains(index))
    }

    /// Sounding duration of one leaf (written duration times the
    /// covering tuplet multiplier, if any).
    pub fn sounding_duration(&self, index: usize) -> Duration {
        let written = self.leaves[index].duration;
        match self.tuplet_at(index) {
            Some(t) => written * t.multiplier,
            None => written,
        }
    }

    /// Offset of each leaf from the voice start, in whole-note units.
    pub fn leaf_offsets(&self) -> Vec<Duration> {
        let mut offsets = Vec::with_capacity(self.leaves.len());
        let mut cursor = Duration::zero();
        for i in 0..self.leaves.len() {
            offsets.push(cursor);
            cursor = cursor + self.sounding_duration(i);
        }
        offsets
    }
}

/// A time signature for one measure.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: i64,
    pub denominator: i64,
}

impl TimeSignature {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::new(self.numerator, self.denominator)
    }

    pub fn lilypond(&self) -> String {
        format!("\\time {}/{}", self.numerator, self.denominator)
    }
}

/// The full score: named voices over a shared measure grid.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Score {
    pub voices: Vec<Voice>,
    pub time_signatures: Vec<TimeSignature>,
}

impl Score {
    pub fn new(time_signatures: Vec<TimeSignature>) -> Self {
        Score {
            voices: Vec::new(),
            time_signatures,
        }
    }

    pub fn add_voice(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn voice(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    pub fn voice_mut(&mut self, name: &str) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.name == name)
    }

    /// Measure start offsets, one per time signature, plus the final
    /// barline offset.
    pub fn measure_offsets(&self) -> Vec<Duration> {
        let mut offsets = Vec::with_capacity(self.time_signatures.len() + 1);
        let mut cursor = Duration::zero();
        for ts in &self.time_signatures {
            offsets.push(cursor);
            cursor = cursor + ts.duration();
        }
        offsets.push(cursor);
        offsets
    }

    /// Measure number (1-based) containing the given offset, or the last
    /// measure for offsets at or past the final barline.
    pub fn measure_number_at(&self, offset: Duration) -> usize {
        let offsets = self.measure_offsets();
        for window in 1..offsets.len() {
            if offset < offsets[window] {
                return window;
            }
        }
        self.time_signatures.len().max(1)
    }
}
