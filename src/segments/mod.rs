//! Segment orchestration
//!
//! A segment maker owns one segment's score, applies the composer's
//! commands to it strictly in the order they were added, reapplies
//! persistent indicators recorded by the previous segment, and collects
//! the metadata the next segment will need. Segments render
//! independently; the metadata mapping is the only thing that travels
//! between rendering passes.

pub mod breaks;

pub use breaks::{BreakEntry, BreakMeasureMap, HorizontalSpacingSpecifier, SpacingFraction};

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::commands::{Command, CommandError, MeasureSpan, Runtime};
use crate::models::{Indicator, Leaf, Score, Tag, TimeSignature, Voice};
use crate::renderers::{render_document, RenderError};

/// Name of the global skip track carrying measure-level annotations.
pub const GLOBAL_SKIPS: &str = "Global_Skips";

/// Tag on indicators restored from the previous segment.
pub const REAPPLIED_TAG: &str = "REAPPLIED";

/// Segment-level failures.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("segment has no voice named {0:?}")]
    UnknownVoice(String),

    #[error("map references measure {measure} but the segment has {measures} measures")]
    UnknownMeasure { measure: usize, measures: usize },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Where a command applies: a voice plus an optional measure span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandScope {
    pub voice: String,
    pub measures: Option<MeasureSpan>,
}

impl CommandScope {
    pub fn voice(name: &str) -> Self {
        CommandScope {
            voice: name.to_string(),
            measures: None,
        }
    }

    pub fn measures(name: &str, span: MeasureSpan) -> Self {
        CommandScope {
            voice: name.to_string(),
            measures: Some(span),
        }
    }
}

/// Orchestrates one segment: score, commands, maps, metadata.
pub struct SegmentMaker {
    name: String,
    score: Score,
    entries: Vec<(CommandScope, Command)>,
    breaks: Option<BreakMeasureMap>,
    spacing: Option<HorizontalSpacingSpecifier>,
    manifests: BTreeMap<String, Value>,
    previous_metadata: BTreeMap<String, Value>,
    metadata: BTreeMap<String, Value>,
}

impl SegmentMaker {
    /// Create a maker for a segment with the given measure grid. The
    /// global skip track is built up front: one skip per measure, time
    /// signature literals attached where the signature changes.
    pub fn new(name: &str, time_signatures: Vec<TimeSignature>) -> Self {
        let mut score = Score::new(time_signatures);
        score.add_voice(build_skips(&score.time_signatures));
        SegmentMaker {
            name: name.to_string(),
            score,
            entries: Vec::new(),
            breaks: None,
            spacing: None,
            manifests: BTreeMap::new(),
            previous_metadata: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn add_voice(&mut self, voice: Voice) {
        self.score.add_voice(voice);
    }

    /// Queue a command; commands run strictly in insertion order.
    pub fn add_command(&mut self, scope: CommandScope, command: Command) {
        self.entries.push((scope, command));
    }

    pub fn set_breaks(&mut self, breaks: BreakMeasureMap) {
        self.breaks = Some(breaks);
    }

    pub fn set_spacing(&mut self, spacing: HorizontalSpacingSpecifier) {
        self.spacing = Some(spacing);
    }

    /// Register a named manifest entry commands can resolve at call
    /// time.
    pub fn add_manifest(&mut self, key: &str, value: Value) {
        self.manifests.insert(key.to_string(), value);
    }

    /// Supply the previous segment's metadata.
    pub fn set_previous_metadata(&mut self, metadata: BTreeMap<String, Value>) {
        self.previous_metadata = metadata;
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn score_mut(&mut self) -> &mut Score {
        &mut self.score
    }

    /// Metadata produced by the last `run`, for the caller to serialize
    /// forward.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Apply everything: reapplied indicators, commands, break and
    /// spacing maps; then collect metadata.
    pub fn run(&mut self) -> Result<(), SegmentError> {
        log::debug!("running segment {:?}", self.name);
        self.reapply_persistent_indicators()?;

        let mut state: BTreeMap<String, Value> = BTreeMap::new();
        let previous_state = self.previous_state();
        for index in 0..self.entries.len() {
            let (scope, mut command) = self.entries[index].clone();
            if command.measures.is_none() {
                command.measures = scope.measures;
            }
            command.tags.push(Tag::new(&self.name));
            let leaf_measures = self.leaf_measures(&scope.voice)?;
            let runtime = Runtime {
                previous_state: previous_state.clone(),
                leaf_measures,
                manifests: self.manifests.clone(),
            };
            log::debug!("applying command {} to {:?}", index + 1, scope.voice);
            let voice = self.score.voice_mut(&scope.voice);
            let outcome = command.call(voice, &runtime)?;
            for (key, value) in outcome.state {
                state.insert(key, value);
            }
        }

        self.apply_layout_maps()?;
        self.attach_final_bar_line();
        self.collect_metadata(state);
        Ok(())
    }

    /// Render the segment as a LilyPond document.
    pub fn render(&self, title: Option<&str>) -> Result<String, SegmentError> {
        Ok(render_document(&self.score, title)?)
    }

    fn previous_state(&self) -> BTreeMap<String, Value> {
        self.previous_metadata
            .get("state")
            .and_then(Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Measure number of each leaf in a voice.
    fn leaf_measures(&self, voice_name: &str) -> Result<Vec<usize>, SegmentError> {
        let voice = self
            .score
            .voice(voice_name)
            .ok_or_else(|| SegmentError::UnknownVoice(voice_name.to_string()))?;
        Ok(voice
            .leaf_offsets()
            .into_iter()
            .map(|offset| self.score.measure_number_at(offset))
            .collect())
    }

    /// Restore indicators the previous segment recorded as persistent,
    /// attaching each to the voice's first leaf under the reapplied tag.
    /// Attachment is idempotent: an identical explicit indicator wins.
    fn reapply_persistent_indicators(&mut self) -> Result<(), SegmentError> {
        let Some(persisted) = self
            .previous_metadata
            .get("persistent_indicators")
            .and_then(Value::as_object)
            .cloned()
        else {
            return Ok(());
        };
        for (voice_name, value) in persisted {
            let Ok(indicators) = serde_json::from_value::<Vec<Indicator>>(value) else {
                log::warn!("unreadable persistent indicators for {:?}", voice_name);
                continue;
            };
            let Some(voice) = self.score.voice_mut(&voice_name) else {
                log::debug!("voice {:?} absent from this segment", voice_name);
                continue;
            };
            let Some(first) = voice.leaves.first_mut() else {
                continue;
            };
            for indicator in indicators {
                if first.has_indicator(&indicator) {
                    log::debug!(
                        "skipping reapplication of {:?} to {:?}: already attached",
                        indicator,
                        voice_name
                    );
                    continue;
                }
                first.attach(indicator, vec![Tag::new(REAPPLIED_TAG)], false);
            }
            check_reapplied_uniqueness(first)?;
        }
        Ok(())
    }

    fn apply_layout_maps(&mut self) -> Result<(), SegmentError> {
        let tags = vec![Tag::new(&self.name)];
        let breaks = self.breaks.clone();
        let spacing = self.spacing.clone();
        let Some(skips) = self.score.voice_mut(GLOBAL_SKIPS) else {
            return Ok(());
        };
        if let Some(map) = breaks {
            map.apply(skips, &tags)?;
        }
        if let Some(map) = spacing {
            map.apply(skips, &tags)?;
        }
        Ok(())
    }

    fn attach_final_bar_line(&mut self) {
        let tags = vec![Tag::new(&self.name)];
        if let Some(skips) = self.score.voice_mut(GLOBAL_SKIPS) {
            if let Some(last) = skips.leaves.last_mut() {
                last.attach(Indicator::BarLine("|.".to_string()), tags, false);
            }
        }
    }

    /// Persist segment facts for the next rendering pass.
    fn collect_metadata(&mut self, state: BTreeMap<String, Value>) {
        let mut metadata = BTreeMap::new();
        metadata.insert("segment".to_string(), Value::from(self.name.clone()));
        metadata.insert(
            "measure_count".to_string(),
            Value::from(self.score.time_signatures.len()),
        );
        let signatures: Vec<String> = self
            .score
            .time_signatures
            .iter()
            .map(|ts| format!("{}/{}", ts.numerator, ts.denominator))
            .collect();
        metadata.insert(
            "time_signatures".to_string(),
            serde_json::to_value(signatures).unwrap_or(Value::Null),
        );
        metadata.insert(
            "state".to_string(),
            Value::Object(state.into_iter().collect()),
        );

        let mut persistent = serde_json::Map::new();
        for voice in &self.score.voices {
            if voice.name == GLOBAL_SKIPS {
                continue;
            }
            let indicators = last_persistent_indicators(voice);
            if indicators.is_empty() {
                continue;
            }
            persistent.insert(
                voice.name.clone(),
                serde_json::to_value(indicators).unwrap_or(Value::Null),
            );
        }
        metadata.insert(
            "persistent_indicators".to_string(),
            Value::Object(persistent),
        );
        self.metadata = metadata;
    }
}

/// One skip per measure, with time signature literals at changes.
fn build_skips(time_signatures: &[TimeSignature]) -> Voice {
    let mut voice = Voice::new(GLOBAL_SKIPS);
    let mut previous: Option<TimeSignature> = None;
    for &ts in time_signatures {
        let mut skip = Leaf::skip(ts.duration());
        if previous != Some(ts) {
            skip.attach(
                Indicator::Literal(ts.lilypond()),
                vec![Tag::new("TIME_SIGNATURE")],
                false,
            );
        }
        voice.add_leaf(skip);
        previous = Some(ts);
    }
    voice
}

/// The last active persistent indicator of each kind in a voice.
fn last_persistent_indicators(voice: &Voice) -> Vec<Indicator> {
    let mut last_clef: Option<Indicator> = None;
    let mut last_dynamic: Option<Indicator> = None;
    for leaf in &voice.leaves {
        for wrapper in &leaf.wrappers {
            if wrapper.deactivate || !wrapper.indicator.is_persistent() {
                continue;
            }
            match wrapper.indicator {
                Indicator::Clef(_) => last_clef = Some(wrapper.indicator.clone()),
                Indicator::Dynamic(_) => last_dynamic = Some(wrapper.indicator.clone()),
                _ => {}
            }
        }
    }
    last_clef.into_iter().chain(last_dynamic).collect()
}

/// Exactly one reapplied wrapper of each kind may sit on a leaf; more
/// than one means conflicting segment metadata.
fn check_reapplied_uniqueness(leaf: &Leaf) -> Result<(), CommandError> {
    let mut seen: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    let reapplied = Tag::new(REAPPLIED_TAG);
    for wrapper in leaf.wrappers_tagged(&reapplied) {
        seen.entry(indicator_kind(&wrapper.indicator))
            .or_default()
            .push(format!("{:?}", wrapper.indicator));
    }
    for wrappers in seen.values() {
        if wrappers.len() > 1 {
            return Err(CommandError::AmbiguousReapplied {
                count: wrappers.len(),
                wrappers: wrappers.join(", "),
            });
        }
    }
    Ok(())
}

fn indicator_kind(indicator: &Indicator) -> &'static str {
    match indicator {
        Indicator::Dynamic(_) => "dynamic",
        Indicator::Articulation(_) => "articulation",
        Indicator::Clef(_) => "clef",
        Indicator::StartHairpin(_) => "start-hairpin",
        Indicator::StopHairpin => "stop-hairpin",
        Indicator::StartTextSpan(_) => "start-text-span",
        Indicator::StopTextSpan => "stop-text-span",
        Indicator::Markup(_) => "markup",
        Indicator::Literal(_) => "literal",
        Indicator::BarLine(_) => "bar-line",
    }
}
