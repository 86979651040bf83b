//! Selections
//!
//! A selection is what a selector hands to a command: leaf indices into
//! the voice the selector was applied to, either flat or grouped. It is
//! a pure reshaping of references; the underlying leaves are untouched.

use serde::{Deserialize, Serialize};

/// Ordered leaf indices, flat or grouped.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Flat(Vec<usize>),
    Grouped(Vec<Vec<usize>>),
}

impl Selection {
    pub fn empty() -> Self {
        Selection::Flat(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Flat(items) => items.is_empty(),
            Selection::Grouped(groups) => groups.iter().all(|g| g.is_empty()),
        }
    }

    /// Number of top-level items (leaves when flat, groups when grouped).
    pub fn len(&self) -> usize {
        match self {
            Selection::Flat(items) => items.len(),
            Selection::Grouped(groups) => groups.len(),
        }
    }

    /// All leaf indices in order.
    pub fn leaves(&self) -> Vec<usize> {
        match self {
            Selection::Flat(items) => items.clone(),
            Selection::Grouped(groups) => groups.iter().flatten().copied().collect(),
        }
    }

    /// View as groups: a flat selection becomes one group per leaf, so
    /// per-group commands treat flat and grouped input uniformly.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        match self {
            Selection::Flat(items) => items.iter().map(|&i| vec![i]).collect(),
            Selection::Grouped(groups) => groups.clone(),
        }
    }

    /// First leaf index, if any.
    pub fn first_leaf(&self) -> Option<usize> {
        self.leaves().first().copied()
    }

    /// Last leaf index, if any.
    pub fn last_leaf(&self) -> Option<usize> {
        self.leaves().last().copied()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::empty()
    }
}
