//! The command family
//!
//! A command pairs a selector with an action and a handful of
//! restrictions. Every command runs through the same skeleton: bail out
//! on missing or empty input, narrow the voice through the selector,
//! resolve the cyclic payload positionally, mutate the matched leaves,
//! and hand any persisted state back to the orchestrator in the
//! outcome record. Commands hold no mutable state of their own and are
//! reusable across scores; the runtime is rebound on every call.

pub mod piecewise;

pub use piecewise::{Bookend, PiecewiseSpec};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Clef, CyclicPitches, CyclicTuple, Indicator, LeafKind, NumberedPitch, Registration, Tag, Voice,
};
use crate::select::{Selection, Selector};

/// Errors raised by command construction and invocation.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// Invalid constructor arguments, raised eagerly by the factories.
    #[error("invalid command configuration: {0}")]
    Config(String),

    /// Fewer payload items than matched targets on an exact command.
    #[error("payload of {found} item(s) does not cover {expected} matched target(s) ({context})")]
    Cardinality {
        expected: usize,
        found: usize,
        context: String,
    },

    /// A piece selector produced leaves outside the governing spanner.
    #[error("piece leaf {leaf} lies outside governing spanner leaves {start}..={stop}")]
    PieceOutsideSpanner { leaf: usize, start: usize, stop: usize },

    /// More than one reapplied wrapper where exactly one was expected.
    #[error("expected exactly one reapplied wrapper, found {count}: {wrappers}")]
    AmbiguousReapplied { count: usize, wrappers: String },

    /// A named manifest entry was missing or malformed.
    #[error("manifest entry {0:?} is missing or malformed")]
    Manifest(String),
}

/// Inclusive 1-based measure span restricting a command.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasureSpan {
    pub start: usize,
    /// `None` means "through the last measure".
    pub stop: Option<usize>,
}

impl MeasureSpan {
    pub fn new(start: usize, stop: Option<usize>) -> Self {
        MeasureSpan { start, stop }
    }

    pub fn single(measure: usize) -> Self {
        MeasureSpan {
            start: measure,
            stop: Some(measure),
        }
    }

    pub fn contains(&self, measure: usize) -> bool {
        measure >= self.start && self.stop.map(|s| measure <= s).unwrap_or(true)
    }
}

/// Orchestrator-supplied context, rebound on every invocation.
#[derive(Clone, Debug, Default)]
pub struct Runtime {
    /// Previous-segment metadata keyed by scope-qualified command keys.
    pub previous_state: BTreeMap<String, Value>,

    /// Measure number (1-based) of each leaf in the scoped voice; empty
    /// when the caller has no measure grid, which disables measure
    /// restrictions.
    pub leaf_measures: Vec<usize>,

    /// Named lookup tables (registrations, metronome marks) supplied by
    /// the composer.
    pub manifests: BTreeMap<String, Value>,
}

/// Persisted state produced by one invocation, collected by the
/// orchestrator and serialized between segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandOutcome {
    pub state: BTreeMap<String, Value>,
}

/// The mutation a command performs on its narrowed selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CommandAction {
    /// Attach one indicator bundle per matched item, cyclically.
    AttachIndicators { bundles: CyclicTuple<Vec<Indicator>> },

    /// Assign pitches cyclically, one payload index per matched group
    /// (a chord consumes its width in payload items). With a persist
    /// key, the starting index resumes from the previous segment.
    AssignPitches {
        pitches: CyclicPitches,
        /// Require the payload length to equal the items consumed.
        exact: bool,
        persist: Option<String>,
    },

    /// Transpose matched groups by whole octaves, cyclically.
    OctaveDisplacement { shifts: CyclicTuple<i64> },

    /// Widen matched pitched leaves to clusters of adjacent white keys.
    Cluster { widths: CyclicTuple<u32> },

    /// Map matched pitches through a registration, inline or named in
    /// the runtime manifests.
    Register {
        registration: Option<Registration>,
        manifest_key: Option<String>,
    },

    /// Linear octave-target interpolation across matched groups.
    RegisterInterpolation {
        start: NumberedPitch,
        stop: NumberedPitch,
    },

    /// Staff-position-space interpolation with pinned endpoints.
    StaffPositionInterpolation {
        start: NumberedPitch,
        stop: NumberedPitch,
    },

    /// Partition into pieces and bookend-attach indicator bundles.
    Piecewise(PiecewiseSpec),
}

impl CommandAction {
    /// Whether the action carries nothing to apply.
    fn is_empty_payload(&self) -> bool {
        match self {
            CommandAction::AttachIndicators { bundles } => bundles.is_empty(),
            CommandAction::AssignPitches { pitches, .. } => pitches.is_empty(),
            CommandAction::OctaveDisplacement { shifts } => shifts.is_empty(),
            CommandAction::Cluster { widths } => widths.is_empty(),
            CommandAction::Register {
                registration,
                manifest_key,
            } => registration.is_none() && manifest_key.is_none(),
            CommandAction::RegisterInterpolation { .. } => false,
            CommandAction::StaffPositionInterpolation { .. } => false,
            CommandAction::Piecewise(spec) => spec.bundles.is_empty(),
        }
    }

    /// Selector used when the command carries none.
    fn default_selector(&self) -> Selector {
        match self {
            CommandAction::AttachIndicators { .. } => Selector::leaves(),
            CommandAction::Piecewise(_) => Selector::leaves(),
            _ => Selector::plts(),
        }
    }
}

/// A configured, reusable command.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Command {
    pub selector: Option<Selector>,
    pub tags: Vec<Tag>,
    pub deactivate: bool,
    pub measures: Option<MeasureSpan>,
    pub action: CommandAction,
}

impl Command {
    pub fn new(action: CommandAction) -> Self {
        Command {
            selector: None,
            tags: Vec::new(),
            deactivate: false,
            measures: None,
            action,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_measures(mut self, measures: MeasureSpan) -> Self {
        self.measures = Some(measures);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.deactivate = true;
        self
    }

    /// Invoke against a voice. `None` input, an empty payload, and an
    /// empty narrowing all return an untouched voice and an empty
    /// outcome.
    pub fn call(
        &self,
        voice: Option<&mut Voice>,
        runtime: &Runtime,
    ) -> Result<CommandOutcome, CommandError> {
        let Some(voice) = voice else {
            return Ok(CommandOutcome::default());
        };
        if self.action.is_empty_payload() {
            return Ok(CommandOutcome::default());
        }
        let window = self.measure_window(voice, runtime);
        let selector = self
            .selector
            .clone()
            .unwrap_or_else(|| self.action.default_selector());
        let selection = selector.apply_within(voice, &window);
        if selection.is_empty() {
            return Ok(CommandOutcome::default());
        }
        self.apply(voice, selection, runtime)
    }

    /// Candidate leaf indices after the measure restriction.
    fn measure_window(&self, voice: &Voice, runtime: &Runtime) -> Vec<usize> {
        let all: Vec<usize> = (0..voice.leaves.len()).collect();
        let Some(span) = self.measures else {
            return all;
        };
        if runtime.leaf_measures.is_empty() {
            log::debug!("measure restriction ignored: no measure map in runtime");
            return all;
        }
        all.into_iter()
            .filter(|&i| {
                runtime
                    .leaf_measures
                    .get(i)
                    .map(|&m| span.contains(m))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn apply(
        &self,
        voice: &mut Voice,
        selection: Selection,
        runtime: &Runtime,
    ) -> Result<CommandOutcome, CommandError> {
        match &self.action {
            CommandAction::AttachIndicators { bundles } => {
                self.attach_indicators(voice, &selection, bundles);
                Ok(CommandOutcome::default())
            }
            CommandAction::AssignPitches {
                pitches,
                exact,
                persist,
            } => self.assign_pitches(voice, &selection, pitches, *exact, persist.as_deref(), runtime),
            CommandAction::OctaveDisplacement { shifts } => {
                self.displace_octaves(voice, &selection, shifts);
                Ok(CommandOutcome::default())
            }
            CommandAction::Cluster { widths } => {
                self.make_clusters(voice, &selection, widths);
                Ok(CommandOutcome::default())
            }
            CommandAction::Register {
                registration,
                manifest_key,
            } => {
                let resolved = self.resolve_registration(registration.as_ref(), manifest_key.as_deref(), runtime)?;
                self.register_pitches(voice, &selection, &resolved);
                Ok(CommandOutcome::default())
            }
            CommandAction::RegisterInterpolation { start, stop } => {
                self.interpolate_register(voice, &selection, *start, *stop);
                Ok(CommandOutcome::default())
            }
            CommandAction::StaffPositionInterpolation { start, stop } => {
                self.interpolate_staff_positions(voice, &selection, *start, *stop);
                Ok(CommandOutcome::default())
            }
            CommandAction::Piecewise(spec) => {
                spec.apply(voice, &selection, &self.tags, self.deactivate)?;
                Ok(CommandOutcome::default())
            }
        }
    }

    fn attach_indicators(
        &self,
        voice: &mut Voice,
        selection: &Selection,
        bundles: &CyclicTuple<Vec<Indicator>>,
    ) {
        for (i, group) in selection.groups().iter().enumerate() {
            let Some(&head) = group.first() else { continue };
            let Some(bundle) = bundles.get(i) else { continue };
            for indicator in bundle {
                voice.leaves[head].attach(indicator.clone(), self.tags.clone(), self.deactivate);
            }
        }
    }

    fn assign_pitches(
        &self,
        voice: &mut Voice,
        selection: &Selection,
        pitches: &CyclicPitches,
        exact: bool,
        persist: Option<&str>,
        runtime: &Runtime,
    ) -> Result<CommandOutcome, CommandError> {
        let start_index = persist
            .and_then(|key| runtime.previous_state.get(key))
            .and_then(|value| value.get("pitches_consumed"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let mut index = start_index;
        let groups = selection.groups();
        for group in &groups {
            let pitched: Vec<usize> = group
                .iter()
                .copied()
                .filter(|&i| voice.leaves[i].is_pitched())
                .collect();
            let Some(&head) = pitched.first() else { continue };
            let width = match voice.leaves[head].kind {
                LeafKind::Chord => voice.leaves[head].pitches.len().max(1),
                _ => 1,
            };
            let mut assigned = Vec::with_capacity(width);
            for offset in 0..width {
                if let Some(pitch) = pitches.at(index + offset) {
                    assigned.push(pitch);
                }
            }
            index += width;
            for &i in &pitched {
                voice.leaves[i].pitches = assigned.clone();
            }
        }
        let consumed = index - start_index;
        if exact && consumed != pitches.len() {
            return Err(CommandError::Cardinality {
                expected: consumed,
                found: pitches.len(),
                context: "exact pitch assignment".to_string(),
            });
        }
        let mut outcome = CommandOutcome::default();
        if let Some(key) = persist {
            outcome.state.insert(
                key.to_string(),
                serde_json::json!({ "pitches_consumed": index }),
            );
        }
        Ok(outcome)
    }

    fn displace_octaves(
        &self,
        voice: &mut Voice,
        selection: &Selection,
        shifts: &CyclicTuple<i64>,
    ) {
        for (i, group) in selection.groups().iter().enumerate() {
            let Some(&octaves) = shifts.get(i) else { continue };
            if octaves == 0 {
                continue;
            }
            for &leaf_index in group {
                let leaf = &mut voice.leaves[leaf_index];
                for pitch in &mut leaf.pitches {
                    *pitch = pitch.transpose(12 * octaves);
                }
            }
        }
    }

    fn make_clusters(&self, voice: &mut Voice, selection: &Selection, widths: &CyclicTuple<u32>) {
        for (i, group) in selection.groups().iter().enumerate() {
            let Some(&width) = widths.get(i) else { continue };
            if width == 0 {
                continue;
            }
            for &leaf_index in group {
                let leaf = &mut voice.leaves[leaf_index];
                let Some(base) = leaf.pitches.first().map(|p| p.diatonic_number()) else {
                    continue;
                };
                leaf.pitches = (0..width as i64)
                    .map(|step| NumberedPitch::from_diatonic(base + step))
                    .collect();
                leaf.kind = if leaf.pitches.len() > 1 {
                    LeafKind::Chord
                } else {
                    LeafKind::Note
                };
            }
        }
    }

    fn resolve_registration(
        &self,
        inline: Option<&Registration>,
        manifest_key: Option<&str>,
        runtime: &Runtime,
    ) -> Result<Registration, CommandError> {
        if let Some(registration) = inline {
            return Ok(registration.clone());
        }
        let Some(key) = manifest_key else {
            return Err(CommandError::Config(
                "register command needs a registration or a manifest key".to_string(),
            ));
        };
        let value = runtime
            .manifests
            .get(key)
            .ok_or_else(|| CommandError::Manifest(key.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|_| CommandError::Manifest(key.to_string()))
    }

    fn register_pitches(&self, voice: &mut Voice, selection: &Selection, registration: &Registration) {
        for leaf_index in selection.leaves() {
            let leaf = &mut voice.leaves[leaf_index];
            for pitch in &mut leaf.pitches {
                match registration.register(*pitch) {
                    Some(registered) => *pitch = registered,
                    None => log::warn!(
                        "pitch {} matched no registration component; left in place",
                        pitch.0
                    ),
                }
            }
        }
    }

    fn interpolate_register(
        &self,
        voice: &mut Voice,
        selection: &Selection,
        start: NumberedPitch,
        stop: NumberedPitch,
    ) {
        let groups = selection.groups();
        let count = groups.len();
        for (i, group) in groups.iter().enumerate() {
            let target = interpolated_target(start.0, stop.0, i, count);
            let registration = Registration::single(NumberedPitch(target));
            for &leaf_index in group {
                let leaf = &mut voice.leaves[leaf_index];
                for pitch in &mut leaf.pitches {
                    if let Some(registered) = registration.register(*pitch) {
                        *pitch = registered;
                    }
                }
            }
        }
    }

    fn interpolate_staff_positions(
        &self,
        voice: &mut Voice,
        selection: &Selection,
        start: NumberedPitch,
        stop: NumberedPitch,
    ) {
        let groups = selection.groups();
        let count = groups.len();
        let clef = clef_in_effect(voice, &groups);
        let start_position = start.staff_position(clef).0;
        let stop_position = stop.staff_position(clef).0;
        for (i, group) in groups.iter().enumerate() {
            // First and last groups pin exactly to the given pitches.
            let pitch = if i == 0 {
                start
            } else if i + 1 == count {
                stop
            } else {
                let position = interpolated_target(start_position, stop_position, i, count);
                crate::models::StaffPosition(position).to_pitch(clef)
            };
            for &leaf_index in group {
                let leaf = &mut voice.leaves[leaf_index];
                if !leaf.is_pitched() {
                    continue;
                }
                leaf.pitches = vec![pitch];
                leaf.kind = LeafKind::Note;
            }
        }
    }
}

/// Linear interpolation from `start` to `stop` over `count` groups,
/// floored to an integer; group 0 hits `start` exactly.
fn interpolated_target(start: i64, stop: i64, index: usize, count: usize) -> i64 {
    if count <= 1 {
        return start;
    }
    let t = index as f64 / (count - 1) as f64;
    let value = start as f64 + (stop as f64 - start as f64) * t;
    value.floor() as i64
}

/// The clef governing the matched groups: the last clef indicator
/// attached at or before the first matched leaf, defaulting to treble.
fn clef_in_effect(voice: &Voice, groups: &[Vec<usize>]) -> Clef {
    let first = groups.iter().flatten().copied().min().unwrap_or(0);
    let mut clef = Clef::Treble;
    for leaf in voice.leaves.iter().take(first + 1) {
        for wrapper in &leaf.wrappers {
            if let Indicator::Clef(c) = wrapper.indicator {
                if !wrapper.deactivate {
                    clef = c;
                }
            }
        }
    }
    clef
}
