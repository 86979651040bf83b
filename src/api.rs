//! Command factory functions
//!
//! The entry points composers call. Each factory validates its
//! arguments eagerly and returns a configured command; selector,
//! measure and tag refinements chain through the builder methods on
//! `Command`. Bad arguments fail here, at composition time, never
//! midway through a segment run.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

use crate::commands::{Bookend, Command, CommandAction, CommandError, PiecewiseSpec};
use crate::models::{
    CyclicPitches, CyclicTuple, Indicator, NumberedPitch, Registration, RegistrationComponent,
};
use crate::segments::{BreakEntry, BreakMeasureMap, HorizontalSpacingSpecifier, SpacingFraction};
use crate::select::Selector;

/// Usable pitch numbers run from C0 to C8.
const PITCH_FLOOR: i64 = -48;
const PITCH_CEILING: i64 = 48;

fn check_pitch(number: i64) -> Result<NumberedPitch, CommandError> {
    if !(PITCH_FLOOR..=PITCH_CEILING).contains(&number) {
        return Err(CommandError::Config(format!(
            "pitch number {} outside {}..={}",
            number, PITCH_FLOOR, PITCH_CEILING
        )));
    }
    Ok(NumberedPitch(number))
}

fn check_pitches(numbers: &[i64], what: &str) -> Result<Vec<NumberedPitch>, CommandError> {
    if numbers.is_empty() {
        return Err(CommandError::Config(format!("{} must be non-empty", what)));
    }
    numbers.iter().map(|&n| check_pitch(n)).collect()
}

/// Assign pitches cyclically to the matched pitched groups.
pub fn pitches(numbers: &[i64]) -> Result<Command, CommandError> {
    let pitches = check_pitches(numbers, "pitches")?;
    Ok(Command::new(CommandAction::AssignPitches {
        pitches: CyclicPitches::new(pitches, Vec::new()),
        exact: false,
        persist: None,
    }))
}

/// Like [`pitches`], but the payload must cover the matched groups
/// exactly once.
pub fn pitches_exact(numbers: &[i64]) -> Result<Command, CommandError> {
    let pitches = check_pitches(numbers, "pitches")?;
    Ok(Command::new(CommandAction::AssignPitches {
        pitches: CyclicPitches::new(pitches, Vec::new()),
        exact: true,
        persist: None,
    }))
}

/// Like [`pitches`], resuming from (and persisting) the consumption
/// cursor stored under `key` in the segment metadata.
pub fn pitches_persistent(numbers: &[i64], key: &str) -> Result<Command, CommandError> {
    if key.is_empty() {
        return Err(CommandError::Config("persist key must be non-empty".to_string()));
    }
    let pitches = check_pitches(numbers, "pitches")?;
    Ok(Command::new(CommandAction::AssignPitches {
        pitches: CyclicPitches::new(pitches, Vec::new()),
        exact: false,
        persist: Some(key.to_string()),
    }))
}

/// Assign a looping pitch sequence that transposes by `intervals` on
/// each completed cycle.
pub fn loop_(numbers: &[i64], intervals: &[i64]) -> Result<Command, CommandError> {
    let pitches = check_pitches(numbers, "loop pitches")?;
    Ok(Command::new(CommandAction::AssignPitches {
        pitches: CyclicPitches::new(pitches, intervals.to_vec()),
        exact: false,
        persist: None,
    }))
}

/// Transpose matched groups by whole octaves, cyclically.
pub fn displacement(shifts: &[i64]) -> Result<Command, CommandError> {
    if shifts.is_empty() {
        return Err(CommandError::Config("displacement shifts must be non-empty".to_string()));
    }
    if shifts.iter().any(|s| s.abs() > 4) {
        return Err(CommandError::Config(
            "octave displacement beyond 4 octaves is unplayable".to_string(),
        ));
    }
    Ok(Command::new(CommandAction::OctaveDisplacement {
        shifts: CyclicTuple::new(shifts.to_vec()),
    }))
}

/// Widen matched pitched leaves into clusters of adjacent white keys.
pub fn clusters(widths: &[u32]) -> Result<Command, CommandError> {
    if widths.is_empty() {
        return Err(CommandError::Config("cluster widths must be non-empty".to_string()));
    }
    if widths.iter().any(|&w| w > 12) {
        return Err(CommandError::Config("cluster width beyond 12 is unplayable".to_string()));
    }
    Ok(Command::new(CommandAction::Cluster {
        widths: CyclicTuple::new(widths.to_vec()),
    }))
}

/// Register matched pitches into the octave starting at `start`.
pub fn register(start: i64) -> Result<Command, CommandError> {
    let origin = check_pitch(start)?;
    Ok(Command::new(CommandAction::Register {
        registration: Some(Registration::single(origin)),
        manifest_key: None,
    }))
}

/// Register through an explicit component list
/// (`(source_start, source_stop, target_origin)` triples).
pub fn register_components(triples: &[(i64, i64, i64)]) -> Result<Command, CommandError> {
    if triples.is_empty() {
        return Err(CommandError::Config("registration components must be non-empty".to_string()));
    }
    let mut components = Vec::with_capacity(triples.len());
    for &(start, stop, target) in triples {
        if start > stop {
            return Err(CommandError::Config(format!(
                "registration source range {}..{} is inverted",
                start, stop
            )));
        }
        components.push(RegistrationComponent {
            source: crate::models::PitchRange::new(start, stop),
            target_origin: check_pitch(target)?,
        });
    }
    Ok(Command::new(CommandAction::Register {
        registration: Some(Registration::new(components)),
        manifest_key: None,
    }))
}

/// Register through a registration stored in the segment manifests.
pub fn register_from_manifest(key: &str) -> Result<Command, CommandError> {
    if key.is_empty() {
        return Err(CommandError::Config("manifest key must be non-empty".to_string()));
    }
    Ok(Command::new(CommandAction::Register {
        registration: None,
        manifest_key: Some(key.to_string()),
    }))
}

/// Interpolate registration octaves from `start` to `stop` across the
/// matched groups.
pub fn register_interpolation(start: i64, stop: i64) -> Result<Command, CommandError> {
    Ok(Command::new(CommandAction::RegisterInterpolation {
        start: check_pitch(start)?,
        stop: check_pitch(stop)?,
    }))
}

/// Interpolate staff positions from `start` to `stop`, pinning the
/// first and last matched groups to the endpoints exactly.
pub fn staff_positions_interpolation(start: i64, stop: i64) -> Result<Command, CommandError> {
    Ok(Command::new(CommandAction::StaffPositionInterpolation {
        start: check_pitch(start)?,
        stop: check_pitch(stop)?,
    }))
}

/// Attach one indicator per matched item, cyclically.
pub fn attach(indicators: Vec<Indicator>) -> Result<Command, CommandError> {
    if indicators.is_empty() {
        return Err(CommandError::Config("indicators must be non-empty".to_string()));
    }
    let bundles: Vec<Vec<Indicator>> = indicators.into_iter().map(|i| vec![i]).collect();
    Ok(Command::new(CommandAction::AttachIndicators {
        bundles: CyclicTuple::new(bundles),
    }))
}

/// Attach dynamics by name, one per matched item, cyclically.
pub fn dynamics(names: &[&str]) -> Result<Command, CommandError> {
    if names.is_empty() {
        return Err(CommandError::Config("dynamic names must be non-empty".to_string()));
    }
    let mut indicators = Vec::with_capacity(names.len());
    for name in names {
        indicators.push(Indicator::Dynamic(check_dynamic(name)?));
    }
    attach(indicators)
}

/// Dynamic names LilyPond defines out of the box.
static KNOWN_DYNAMICS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "ppppp", "pppp", "ppp", "pp", "p", "mp", "mf", "f", "ff", "fff", "ffff", "fffff", "fp",
        "sf", "sff", "sp", "spp", "sfz", "rfz",
    ]
    .into_iter()
    .collect()
});

fn check_dynamic(name: &str) -> Result<String, CommandError> {
    if !KNOWN_DYNAMICS.contains(name) {
        return Err(CommandError::Config(format!("unknown dynamic {:?}", name)));
    }
    Ok(name.to_string())
}

/// Build a piecewise hairpin command from a descriptor like
/// `"p < f > p"`: dynamics start pieces, `<` and `>` open hairpins
/// toward the next dynamic.
pub fn hairpin(descriptor: &str) -> Result<Command, CommandError> {
    let mut bundles: Vec<Vec<Indicator>> = Vec::new();
    for token in descriptor.split_whitespace() {
        match token {
            "<" | ">" => {
                let Some(bundle) = bundles.last_mut() else {
                    return Err(CommandError::Config(format!(
                        "hairpin descriptor {:?} starts with a hairpin glyph",
                        descriptor
                    )));
                };
                bundle.push(Indicator::StartHairpin(token.to_string()));
            }
            name => {
                bundles.push(vec![Indicator::Dynamic(check_dynamic(name)?)]);
            }
        }
    }
    if bundles.is_empty() {
        return Err(CommandError::Config("hairpin descriptor is empty".to_string()));
    }
    Ok(Command::new(CommandAction::Piecewise(PiecewiseSpec {
        bundles: CyclicTuple::new(bundles),
        piece_selector: Selector::leaves().group(),
        bookend: Bookend::Index(-1),
    })))
}

/// Build a piecewise text spanner cycling through the given labels.
pub fn text_spanner(labels: &[&str]) -> Result<Command, CommandError> {
    if labels.is_empty() {
        return Err(CommandError::Config("text spanner labels must be non-empty".to_string()));
    }
    let bundles: Vec<Vec<Indicator>> = labels
        .iter()
        .map(|label| vec![Indicator::StartTextSpan(label.to_string())])
        .collect();
    Ok(Command::new(CommandAction::Piecewise(PiecewiseSpec {
        bundles: CyclicTuple::new(bundles),
        piece_selector: Selector::leaves().group(),
        bookend: Bookend::Index(-1),
    })))
}

/// Generic piecewise command over explicit bundles and a piece
/// selector.
pub fn piecewise(
    bundles: Vec<Vec<Indicator>>,
    piece_selector: Selector,
    bookend: Bookend,
) -> Result<Command, CommandError> {
    if bundles.is_empty() || bundles.iter().all(|b| b.is_empty()) {
        return Err(CommandError::Config("piecewise bundles must be non-empty".to_string()));
    }
    Ok(Command::new(CommandAction::Piecewise(PiecewiseSpec {
        bundles: CyclicTuple::new(bundles),
        piece_selector,
        bookend,
    })))
}

/// Build a break map from `(measure, y_offset, alignment_distances)`
/// entries.
pub fn breaks(entries: &[(usize, i64, &[i64])]) -> Result<BreakMeasureMap, CommandError> {
    let mut map = BTreeMap::new();
    for &(measure, y_offset, distances) in entries {
        if measure == 0 {
            return Err(CommandError::Config("measure numbers are 1-based".to_string()));
        }
        if map
            .insert(
                measure,
                BreakEntry {
                    y_offset,
                    alignment_distances: distances.to_vec(),
                },
            )
            .is_some()
        {
            return Err(CommandError::Config(format!(
                "duplicate break entry for measure {}",
                measure
            )));
        }
    }
    Ok(BreakMeasureMap::new(map))
}

/// Build a spacing specifier from a default fraction and per-measure
/// overrides.
pub fn spacing(
    default: Option<SpacingFraction>,
    overrides: &[(usize, SpacingFraction)],
) -> Result<HorizontalSpacingSpecifier, CommandError> {
    let check = |(n, d): SpacingFraction| -> Result<(), CommandError> {
        if n <= 0 || d <= 0 {
            return Err(CommandError::Config(format!(
                "spacing fraction {}/{} must be positive",
                n, d
            )));
        }
        Ok(())
    };
    if let Some(fraction) = default {
        check(fraction)?;
    }
    let mut map = BTreeMap::new();
    for &(measure, fraction) in overrides {
        if measure == 0 {
            return Err(CommandError::Config("measure numbers are 1-based".to_string()));
        }
        check(fraction)?;
        map.insert(measure, fraction);
    }
    Ok(HorizontalSpacingSpecifier::new(default, map))
}
