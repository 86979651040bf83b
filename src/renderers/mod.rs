//! Renderers module
//!
//! Export logic for converting the score model into output formats.
//! LilyPond is the only backend; its text payloads are emitted verbatim
//! and never parsed.

pub mod lilypond;

pub use lilypond::{render_document, render_staves, LilyPondTemplate, TemplateContext};

use thiserror::Error;

use crate::models::Duration;

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A leaf duration no single notehead can carry reached the
    /// renderer (the rhythm-maker splits these; hand-built scores must
    /// too).
    #[error("duration {0} is not assignable to a single notehead")]
    UnassignableDuration(Duration),

    /// A structurally invalid leaf (e.g. a note without a pitch).
    #[error("malformed leaf: {0}")]
    MalformedLeaf(String),

    /// Template compilation or rendering failed.
    #[error("template rendering failed: {0}")]
    Template(#[from] mustache::Error),
}
