//! Selector expressions
//!
//! A selector is an immutable query value: a base axis plus a left-to-
//! right list of combinator steps, applied lazily when a command runs.
//! Selectors never mutate the score; they produce index selections into
//! the voice they are applied to. Empty results are valid and make the
//! downstream command a no-op.

pub mod selection;

pub use selection::Selection;

use serde::{Deserialize, Serialize};

use crate::models::Voice;

/// What the selector starts from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    /// Every leaf.
    Leaves,
    /// Notes and chords only.
    PitchedLeaves,
    /// Maximal tied groups over every leaf (untied leaves are
    /// singletons).
    LogicalTies,
    /// Maximal tied groups of pitched leaves.
    PitchedLogicalTies,
    /// Maximal runs of adjacent pitched leaves.
    Runs,
}

/// One combinator step, applied to the current items.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
enum Step {
    /// Python-style signed slice over items.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
    },
    /// Single item by signed index.
    Index(i64),
    /// Drop items at the given signed indices.
    Exclude(Vec<i64>),
    /// Reshape everything into one group.
    Group,
    /// Flatten groups back to leaves.
    Leaves,
}

/// A deferred, composable leaf query.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    axis: Axis,
    steps: Vec<Step>,
}

impl Selector {
    /// All leaves.
    pub fn leaves() -> Self {
        Selector {
            axis: Axis::Leaves,
            steps: Vec::new(),
        }
    }

    /// Notes and chords.
    pub fn pitched_leaves() -> Self {
        Selector {
            axis: Axis::PitchedLeaves,
            steps: Vec::new(),
        }
    }

    /// Logical ties over every leaf.
    pub fn logical_ties() -> Self {
        Selector {
            axis: Axis::LogicalTies,
            steps: Vec::new(),
        }
    }

    /// Pitched logical ties (tied note/chord groups).
    pub fn plts() -> Self {
        Selector {
            axis: Axis::PitchedLogicalTies,
            steps: Vec::new(),
        }
    }

    /// Maximal runs of adjacent pitched leaves.
    pub fn runs() -> Self {
        Selector {
            axis: Axis::Runs,
            steps: Vec::new(),
        }
    }

    /// Keep items in `start..stop` (signed, stop exclusive, `None` open).
    pub fn slice(mut self, start: Option<i64>, stop: Option<i64>) -> Self {
        self.steps.push(Step::Slice { start, stop });
        self
    }

    /// Keep the single item at the signed index.
    pub fn index(mut self, index: i64) -> Self {
        self.steps.push(Step::Index(index));
        self
    }

    /// Drop the items at the given signed indices.
    pub fn exclude(mut self, indices: &[i64]) -> Self {
        self.steps.push(Step::Exclude(indices.to_vec()));
        self
    }

    /// Reshape the current items into one group.
    pub fn group(mut self) -> Self {
        self.steps.push(Step::Group);
        self
    }

    /// Flatten groups back to a flat leaf sequence.
    pub fn flatten(mut self) -> Self {
        self.steps.push(Step::Leaves);
        self
    }

    /// Apply to every leaf of a voice.
    pub fn apply(&self, voice: &Voice) -> Selection {
        let all: Vec<usize> = (0..voice.leaves.len()).collect();
        self.apply_within(voice, &all)
    }

    /// Apply to a restricted candidate window (ordered leaf indices),
    /// e.g. the leaves of a measure span.
    pub fn apply_within(&self, voice: &Voice, window: &[usize]) -> Selection {
        let mut current = self.base(voice, window);
        for step in &self.steps {
            current = apply_step(step, current);
        }
        current
    }

    fn base(&self, voice: &Voice, window: &[usize]) -> Selection {
        match self.axis {
            Axis::Leaves => Selection::Flat(window.to_vec()),
            Axis::PitchedLeaves => Selection::Flat(
                window
                    .iter()
                    .copied()
                    .filter(|&i| voice.leaves[i].is_pitched())
                    .collect(),
            ),
            Axis::LogicalTies => Selection::Grouped(tie_groups(voice, window, false)),
            Axis::PitchedLogicalTies => Selection::Grouped(tie_groups(voice, window, true)),
            Axis::Runs => Selection::Grouped(pitched_runs(voice, window)),
        }
    }
}

/// Group a window into logical ties. A tie group is a maximal chain of
/// adjacent pitched leaves linked by tie flags; every other leaf is a
/// singleton. With `pitched_only`, unpitched singletons are dropped.
fn tie_groups(voice: &Voice, window: &[usize], pitched_only: bool) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &i in window {
        let leaf = &voice.leaves[i];
        if !leaf.is_pitched() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            if !pitched_only {
                groups.push(vec![i]);
            }
            continue;
        }
        let chained = match current.last() {
            Some(&prev) => prev + 1 == i && voice.leaves[prev].tie,
            None => false,
        };
        if !chained && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(i);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Maximal runs of adjacent pitched leaves (ties irrelevant).
fn pitched_runs(voice: &Voice, window: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &i in window {
        if voice.leaves[i].is_pitched() {
            let adjacent = current.last().map(|&prev| prev + 1 == i).unwrap_or(true);
            if !adjacent {
                groups.push(std::mem::take(&mut current));
            }
            current.push(i);
        } else if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn apply_step(step: &Step, selection: Selection) -> Selection {
    match step {
        Step::Slice { start, stop } => map_items(selection, |len| slice_range(*start, *stop, len)),
        Step::Index(index) => map_items(selection, |len| {
            resolve_index(*index, len).map(|i| i..i + 1).unwrap_or(0..0)
        }),
        Step::Exclude(indices) => exclude_items(selection, indices),
        Step::Group => Selection::Grouped(vec![selection.leaves()]),
        Step::Leaves => Selection::Flat(selection.leaves()),
    }
}

fn map_items<F: Fn(usize) -> std::ops::Range<usize>>(selection: Selection, range: F) -> Selection {
    match selection {
        Selection::Flat(items) => {
            let r = range(items.len());
            Selection::Flat(items[r].to_vec())
        }
        Selection::Grouped(groups) => {
            let r = range(groups.len());
            Selection::Grouped(groups[r].to_vec())
        }
    }
}

fn exclude_items(selection: Selection, indices: &[i64]) -> Selection {
    let keep = |len: usize| -> Vec<bool> {
        let mut mask = vec![true; len];
        for &signed in indices {
            if let Some(i) = resolve_index(signed, len) {
                mask[i] = false;
            }
        }
        mask
    };
    match selection {
        Selection::Flat(items) => {
            let mask = keep(items.len());
            Selection::Flat(
                items
                    .into_iter()
                    .zip(mask)
                    .filter_map(|(item, keep)| keep.then_some(item))
                    .collect(),
            )
        }
        Selection::Grouped(groups) => {
            let mask = keep(groups.len());
            Selection::Grouped(
                groups
                    .into_iter()
                    .zip(mask)
                    .filter_map(|(group, keep)| keep.then_some(group))
                    .collect(),
            )
        }
    }
}

/// Resolve a Python-style signed index; out-of-range yields `None`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Resolve a Python-style signed slice to a clamped half-open range.
fn slice_range(start: Option<i64>, stop: Option<i64>, len: usize) -> std::ops::Range<usize> {
    let clamp = |signed: i64| -> usize {
        let len = len as i64;
        let v = if signed < 0 { signed + len } else { signed };
        v.clamp(0, len) as usize
    };
    let lo = start.map(clamp).unwrap_or(0);
    let hi = stop.map(clamp).unwrap_or(len);
    if lo >= hi {
        0..0
    } else {
        lo..hi
    }
}
