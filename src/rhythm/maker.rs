//! Pitch-first rhythm-maker
//!
//! Converts pitch collections into rhythmicized figures under a talea.
//! The maker itself is immutable; the talea cursor and collection
//! counter travel in an explicit state record passed in and returned
//! out, so one call can resume exactly where a previous segment's call
//! left off.

use serde::{Deserialize, Serialize};

use crate::models::{CyclicTuple, Duration, Leaf, NumberedPitch, Voice};

use super::talea::Talea;
use super::treatments::{interpolate_durations, TimeTreatment};
use super::RhythmError;

/// One element of an input collection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum PitchToken {
    Pitch(NumberedPitch),
    Chord(Vec<NumberedPitch>),
    /// Explicit rest marker: consumes one talea entry as silence.
    Rest,
}

/// Cross-invocation cursors, serializable as a flat mapping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RhythmState {
    /// Talea cursor in talea units consumed.
    pub next_attack: u64,
    /// Collections consumed so far (also indexes the treatment cycle).
    pub next_segment: u64,
}

/// The leaves one collection produced, plus the tuplet multiplier the
/// time treatment decided on (`None` for a trivial figure).
#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    pub leaves: Vec<Leaf>,
    pub multiplier: Option<Duration>,
}

impl Figure {
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Stateful talea-driven generator of rhythmicized figures.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PitchFirstRhythmMaker {
    talea: Talea,
    time_treatments: CyclicTuple<TimeTreatment>,
}

impl PitchFirstRhythmMaker {
    pub fn new(
        talea: Talea,
        time_treatments: Vec<TimeTreatment>,
    ) -> Result<Self, RhythmError> {
        for treatment in &time_treatments {
            treatment.validate()?;
        }
        Ok(PitchFirstRhythmMaker {
            talea,
            time_treatments: CyclicTuple::new(time_treatments),
        })
    }

    pub fn talea(&self) -> &Talea {
        &self.talea
    }

    /// Convert collections into figures, resuming from `state`.
    ///
    /// Empty collections produce empty figures and advance neither
    /// cursor. Each non-empty collection advances `next_segment` by one
    /// and `next_attack` by the talea weight it consumed.
    pub fn call(
        &self,
        collections: &[Vec<PitchToken>],
        state: Option<RhythmState>,
    ) -> Result<(Vec<Figure>, RhythmState), RhythmError> {
        let mut state = state.unwrap_or_default();
        let mut figures = Vec::with_capacity(collections.len());
        for collection in collections {
            if collection.is_empty() {
                figures.push(Figure {
                    leaves: Vec::new(),
                    multiplier: None,
                });
                continue;
            }
            let figure = self.make_figure(collection, &mut state)?;
            figures.push(figure);
        }
        Ok((figures, state))
    }

    /// Append the figures for `collections` to a voice as tuplets.
    pub fn append_to_voice(
        &self,
        voice: &mut Voice,
        collections: &[Vec<PitchToken>],
        state: Option<RhythmState>,
    ) -> Result<RhythmState, RhythmError> {
        let (figures, state) = self.call(collections, state)?;
        for figure in figures {
            if figure.is_empty() {
                continue;
            }
            let multiplier = figure.multiplier.unwrap_or_else(|| Duration::new(1, 1));
            voice.add_tuplet(figure.leaves, multiplier);
        }
        Ok(state)
    }

    fn make_figure(
        &self,
        collection: &[PitchToken],
        state: &mut RhythmState,
    ) -> Result<Figure, RhythmError> {
        let mut leaves: Vec<Leaf> = Vec::new();
        let mut consumed: u64 = 0;
        for token in collection {
            match token {
                PitchToken::Rest => {
                    let entry = self.talea.entry_at(state.next_attack + consumed);
                    consumed += entry.unsigned_abs();
                    push_rest(&mut leaves, self.talea.entry_duration(entry));
                }
                PitchToken::Pitch(_) | PitchToken::Chord(_) => {
                    // Leading negative entries become rests and do not
                    // consume the token.
                    loop {
                        let entry = self.talea.entry_at(state.next_attack + consumed);
                        consumed += entry.unsigned_abs();
                        if entry < 0 {
                            push_rest(&mut leaves, self.talea.entry_duration(entry));
                            continue;
                        }
                        push_pitched(&mut leaves, token, self.talea.entry_duration(entry));
                        break;
                    }
                }
            }
        }

        let natural: Duration = leaves.iter().map(|l| l.duration).sum();
        let treatment = self.time_treatments.get(state.next_segment as usize).copied();
        let multiplier = match treatment {
            None => None,
            Some(TimeTreatment::Accelerando) => {
                apply_interpolation(&mut leaves, false);
                None
            }
            Some(TimeTreatment::Ritardando) => {
                apply_interpolation(&mut leaves, true);
                None
            }
            Some(other) => other.multiplier(consumed, natural),
        };

        state.next_attack += consumed;
        state.next_segment += 1;
        Ok(Figure { leaves, multiplier })
    }
}

fn apply_interpolation(leaves: &mut [Leaf], ritardando: bool) {
    let originals: Vec<Duration> = leaves.iter().map(|l| l.duration).collect();
    let interpolated = interpolate_durations(&originals, ritardando);
    for (leaf, duration) in leaves.iter_mut().zip(interpolated) {
        leaf.duration = duration;
    }
}

/// Append a rest, splitting unassignable durations into tied-free parts.
fn push_rest(leaves: &mut Vec<Leaf>, duration: Duration) {
    for part in assignable_parts(duration) {
        leaves.push(Leaf::rest(part));
    }
}

/// Append a note or chord, splitting unassignable durations into tied
/// leaves.
fn push_pitched(leaves: &mut Vec<Leaf>, token: &PitchToken, duration: Duration) {
    let parts = assignable_parts(duration);
    let last = parts.len() - 1;
    for (i, part) in parts.into_iter().enumerate() {
        let mut leaf = match token {
            PitchToken::Pitch(pitch) => Leaf::note(*pitch, part),
            PitchToken::Chord(pitches) => Leaf::chord(pitches.clone(), part),
            PitchToken::Rest => unreachable!("rests handled by push_rest"),
        };
        leaf.tie = i < last;
        leaves.push(leaf);
    }
}

/// Decompose a duration into assignable parts, largest first.
fn assignable_parts(duration: Duration) -> Vec<Duration> {
    if duration.is_assignable() {
        return vec![duration];
    }
    let denominator = duration.denominator();
    let mut remaining = duration.numerator();
    let mut parts = Vec::new();
    while remaining > 0 {
        let mut best = 1i64;
        // Assignable numerators are 1, 3 or 7 times a power of two.
        for base in [1i64, 3, 7] {
            let mut candidate = base;
            while candidate <= remaining {
                if candidate > best {
                    best = candidate;
                }
                candidate *= 2;
            }
        }
        parts.push(Duration::new(best, denominator));
        remaining -= best;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeafKind;

    fn maker(counts: Vec<i64>, denominator: i64) -> PitchFirstRhythmMaker {
        PitchFirstRhythmMaker::new(Talea::new(counts, denominator).unwrap(), vec![]).unwrap()
    }

    fn pitches(numbers: &[i64]) -> Vec<PitchToken> {
        numbers
            .iter()
            .map(|&n| PitchToken::Pitch(NumberedPitch(n)))
            .collect()
    }

    #[test]
    fn test_basic_figure_consumes_weight() {
        let maker = maker(vec![1, 1, 2], 16);
        let (figures, state) = maker.call(&[pitches(&[0, 2, 10])], None).unwrap();
        assert_eq!(state.next_attack, 4);
        assert_eq!(state.next_segment, 1);
        let figure = &figures[0];
        assert_eq!(figure.leaves.len(), 3);
        assert_eq!(figure.leaves[0].duration, Duration::new(1, 16));
        assert_eq!(figure.leaves[1].duration, Duration::new(1, 16));
        assert_eq!(figure.leaves[2].duration, Duration::new(2, 16));
    }

    #[test]
    fn test_negative_entries_make_rests() {
        let maker = maker(vec![1, -1, 2], 16);
        let (figures, state) = maker.call(&[pitches(&[0, 2])], None).unwrap();
        // Pitch 0 takes entry 1; the -1 becomes a rest; pitch 2 takes 2.
        let kinds: Vec<LeafKind> = figures[0].leaves.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![LeafKind::Note, LeafKind::Rest, LeafKind::Note]);
        assert_eq!(state.next_attack, 4);
    }

    #[test]
    fn test_state_resumes_across_calls() {
        let maker = maker(vec![1, 1, 2], 16);
        let (_, state) = maker.call(&[pitches(&[0])], None).unwrap();
        assert_eq!(state.next_attack, 1);
        let (figures, state) = maker.call(&[pitches(&[2, 10])], Some(state)).unwrap();
        // Resumes at the second entry.
        assert_eq!(figures[0].leaves[0].duration, Duration::new(1, 16));
        assert_eq!(figures[0].leaves[1].duration, Duration::new(2, 16));
        assert_eq!(state.next_attack, 4);
        assert_eq!(state.next_segment, 2);
    }

    #[test]
    fn test_empty_collection_advances_nothing() {
        let maker = maker(vec![1, 1, 2], 16);
        let (figures, state) = maker.call(&[vec![]], None).unwrap();
        assert!(figures[0].is_empty());
        assert_eq!(state, RhythmState::default());
    }

    #[test]
    fn test_unassignable_durations_split_into_ties() {
        let maker = maker(vec![5], 16);
        let (figures, _) = maker.call(&[pitches(&[0])], None).unwrap();
        let leaves = &figures[0].leaves;
        // 5/16 splits into 4/16 tied to 1/16.
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].duration, Duration::new(1, 4));
        assert!(leaves[0].tie);
        assert_eq!(leaves[1].duration, Duration::new(1, 16));
        assert!(!leaves[1].tie);
    }
}
