//! LilyPond rendering
//!
//! Turns a score into a complete LilyPond document: notation generation
//! for the staves, mustache templates for the document shell.

pub mod notation;
pub mod templates;

pub use notation::{escape_lilypond_string, render_music, render_staff, render_staves};
pub use templates::{render_lilypond, LilyPondTemplate, TemplateContext};

use crate::models::Score;

use super::RenderError;

/// LilyPond version written into rendered documents.
pub const LILYPOND_VERSION: &str = "2.24.0";

/// Render a complete LilyPond document for a score.
///
/// A title selects the standard template (header + layout); without one
/// the minimal shell is used.
pub fn render_document(score: &Score, title: Option<&str>) -> Result<String, RenderError> {
    let staves = render_staves(score)?;
    let context = TemplateContext::builder(LILYPOND_VERSION.to_string(), staves)
        .title(title.map(escape_lilypond_string))
        .build();
    let template = if title.is_some() {
        LilyPondTemplate::Standard
    } else {
        LilyPondTemplate::Minimal
    };
    render_lilypond(template, &context)
}
