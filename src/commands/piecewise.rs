//! Piecewise spanner commands
//!
//! A piecewise command partitions the leaves matched by its governing
//! selector into pieces and walks them in order: piece `i` gets bundle
//! `i` at its first leaf, and when the bookend policy fires, bundle
//! `i + 1` at its last leaf. The off-by-one models transition labels:
//! a piece's trailing indicator is the next piece's leading one. Used
//! for hairpins, text spans and gliding registration marks.

use serde::{Deserialize, Serialize};

use crate::models::{CyclicTuple, Indicator, Tag, Voice};
use crate::select::{Selection, Selector};

use super::CommandError;

/// When a piece also gets a trailing (bookend) indicator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bookend {
    Never,
    Always,
    /// Only the piece whose index equals this value modulo the piece
    /// count.
    Index(i64),
}

impl Bookend {
    fn applies_to(&self, piece_index: usize, piece_count: usize) -> bool {
        match self {
            Bookend::Never => false,
            Bookend::Always => true,
            Bookend::Index(n) => {
                piece_count > 0 && piece_index as i64 == n.rem_euclid(piece_count as i64)
            }
        }
    }
}

/// Payload and policy of a piecewise command.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PiecewiseSpec {
    /// Indicator bundles, consumed cyclically per piece.
    pub bundles: CyclicTuple<Vec<Indicator>>,

    /// Secondary selector partitioning the governing leaves into pieces.
    pub piece_selector: Selector,

    pub bookend: Bookend,
}

impl PiecewiseSpec {
    /// Attach bundles over the pieces of the governing selection.
    ///
    /// Every piece leaf must lie inside the governing leaf set; a piece
    /// reaching outside is a contradiction between the two selectors and
    /// raises with both operands in the message.
    pub fn apply(
        &self,
        voice: &mut Voice,
        governing: &Selection,
        tags: &[Tag],
        deactivate: bool,
    ) -> Result<(), CommandError> {
        let spanner_leaves = governing.leaves();
        let (Some(&spanner_start), Some(&spanner_stop)) =
            (spanner_leaves.first(), spanner_leaves.last())
        else {
            return Ok(());
        };

        // Pieces are drawn from the whole voice, independently of the
        // governing selector; the containment check below is what ties
        // the two together.
        let pieces: Vec<Vec<usize>> = self
            .piece_selector
            .apply(voice)
            .groups()
            .into_iter()
            .filter(|piece| !piece.is_empty())
            .collect();
        for piece in &pieces {
            for &leaf in piece {
                if !spanner_leaves.contains(&leaf) {
                    return Err(CommandError::PieceOutsideSpanner {
                        leaf,
                        start: spanner_start,
                        stop: spanner_stop,
                    });
                }
            }
        }

        let piece_count = pieces.len();
        for (i, piece) in pieces.iter().enumerate() {
            let head = piece[0];
            if let Some(bundle) = self.bundles.get(i) {
                for indicator in bundle {
                    voice.leaves[head].attach(indicator.clone(), tags.to_vec(), deactivate);
                }
            }

            if !self.bookend.applies_to(i, piece_count) {
                continue;
            }
            if piece.len() <= 1 {
                continue;
            }
            let tail = piece[piece.len() - 1];
            if let Some(bundle) = self.bundles.get(i + 1) {
                for indicator in bundle {
                    voice.leaves[tail].attach(indicator.clone(), tags.to_vec(), deactivate);
                }
            }
        }
        Ok(())
    }
}
