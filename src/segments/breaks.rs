//! Break and spacing maps
//!
//! Per-measure layout metadata applied to the global skip track once
//! during segment finalization. Both maps are built ahead of time and
//! read-only afterwards; the LilyPond they attach is opaque payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Indicator, Tag, Voice};

use super::SegmentError;

/// Layout details for one line break.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BreakEntry {
    /// Vertical offset of the new system.
    pub y_offset: i64,
    /// Alignment distances between staves of the system.
    pub alignment_distances: Vec<i64>,
}

impl BreakEntry {
    fn literal(&self) -> String {
        let distances: Vec<String> = self
            .alignment_distances
            .iter()
            .map(|d| d.to_string())
            .collect();
        format!(
            "\\overrideProperty Score.NonMusicalPaperColumn.line-break-system-details #'((Y-offset . {}) (alignment-distances . ({})))",
            self.y_offset,
            distances.join(" ")
        )
    }
}

/// Measure-number → line-break map for one segment.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BreakMeasureMap {
    entries: BTreeMap<usize, BreakEntry>,
}

impl BreakMeasureMap {
    pub fn new(entries: BTreeMap<usize, BreakEntry>) -> Self {
        BreakMeasureMap { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attach break literals to the skip leaves (one per measure).
    pub fn apply(&self, skips: &mut Voice, tags: &[Tag]) -> Result<(), SegmentError> {
        for (&measure, entry) in &self.entries {
            if measure == 0 || measure > skips.leaves.len() {
                return Err(SegmentError::UnknownMeasure {
                    measure,
                    measures: skips.leaves.len(),
                });
            }
            let skip = &mut skips.leaves[measure - 1];
            skip.attach(Indicator::Literal(entry.literal()), tags.to_vec(), false);
            skip.attach(
                Indicator::Literal("\\break".to_string()),
                tags.to_vec(),
                false,
            );
        }
        Ok(())
    }
}

/// A spacing fraction (numerator, denominator of a whole note).
pub type SpacingFraction = (i64, i64);

/// Proportional-spacing map: a default duration fraction plus
/// per-measure overrides.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HorizontalSpacingSpecifier {
    pub default: Option<SpacingFraction>,
    pub overrides: BTreeMap<usize, SpacingFraction>,
}

impl HorizontalSpacingSpecifier {
    pub fn new(default: Option<SpacingFraction>, overrides: BTreeMap<usize, SpacingFraction>) -> Self {
        HorizontalSpacingSpecifier { default, overrides }
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.overrides.is_empty()
    }

    /// Attach a spacing section to every measure that has a fraction.
    pub fn apply(&self, skips: &mut Voice, tags: &[Tag]) -> Result<(), SegmentError> {
        for &measure in self.overrides.keys() {
            if measure == 0 || measure > skips.leaves.len() {
                return Err(SegmentError::UnknownMeasure {
                    measure,
                    measures: skips.leaves.len(),
                });
            }
        }
        for (index, skip) in skips.leaves.iter_mut().enumerate() {
            let measure = index + 1;
            let fraction = self.overrides.get(&measure).copied().or(self.default);
            let Some((numerator, denominator)) = fraction else {
                continue;
            };
            skip.attach(
                Indicator::Literal("\\newSpacingSection".to_string()),
                tags.to_vec(),
                false,
            );
            skip.attach(
                Indicator::Literal(format!(
                    "\\set Score.proportionalNotationDuration = #(ly:make-moment {}/{})",
                    numerator, denominator
                )),
                tags.to_vec(),
                false,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Duration, Leaf};

    fn skips(count: usize) -> Voice {
        let mut voice = Voice::new("Global_Skips");
        for _ in 0..count {
            voice.add_leaf(Leaf::skip(Duration::new(1, 1)));
        }
        voice
    }

    #[test]
    fn test_break_map_attaches_to_named_measure() {
        let mut entries = BTreeMap::new();
        entries.insert(
            2,
            BreakEntry {
                y_offset: 40,
                alignment_distances: vec![12, 10],
            },
        );
        let map = BreakMeasureMap::new(entries);
        let mut voice = skips(3);
        map.apply(&mut voice, &[Tag::new("BREAKS")]).unwrap();
        assert!(voice.leaves[0].wrappers.is_empty());
        let texts: Vec<String> = voice.leaves[1]
            .wrappers
            .iter()
            .map(|w| w.indicator.lilypond())
            .collect();
        assert!(texts.iter().any(|t| t == "\\break"));
        assert!(texts.iter().any(|t| t.contains("(Y-offset . 40)")));
    }

    #[test]
    fn test_break_map_rejects_unknown_measure() {
        let mut entries = BTreeMap::new();
        entries.insert(
            9,
            BreakEntry {
                y_offset: 0,
                alignment_distances: vec![],
            },
        );
        let map = BreakMeasureMap::new(entries);
        let mut voice = skips(3);
        let err = map.apply(&mut voice, &[]).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::UnknownMeasure {
                measure: 9,
                measures: 3
            }
        ));
    }

    #[test]
    fn test_spacing_default_with_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert(2, (1, 16));
        let spacing = HorizontalSpacingSpecifier::new(Some((1, 12)), overrides);
        let mut voice = skips(2);
        spacing.apply(&mut voice, &[]).unwrap();
        let first: Vec<String> = voice.leaves[0]
            .wrappers
            .iter()
            .map(|w| w.indicator.lilypond())
            .collect();
        assert!(first.iter().any(|t| t.contains("1/12")));
        let second: Vec<String> = voice.leaves[1]
            .wrappers
            .iter()
            .map(|w| w.indicator.lilypond())
            .collect();
        assert!(second.iter().any(|t| t.contains("1/16")));
    }
}
