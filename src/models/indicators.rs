//! Indicators and attachment wrappers
//!
//! An indicator is a payload a command attaches to a leaf: a dynamic, an
//! articulation, a clef, a spanner endpoint, or an opaque LilyPond
//! literal. The wrapper records who attached it (tags) and whether the
//! attachment is deactivated (emitted commented-out).

use serde::{Deserialize, Serialize};

use super::pitch::Clef;

/// A tag atom carried on wrappers for provenance and deactivation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(text: &str) -> Self {
        Tag(text.to_string())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payloads attachable to a leaf.
///
/// LilyPond text inside `Literal` and `Markup` is opaque to this crate;
/// it is emitted verbatim and never parsed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Indicator {
    /// A dynamic mark, e.g. "p", "ff", "sfz".
    Dynamic(String),
    /// An articulation, e.g. "staccato", "accent".
    Articulation(String),
    Clef(Clef),
    /// Crescendo ("<") or decrescendo (">") hairpin start.
    StartHairpin(String),
    StopHairpin,
    /// Text spanner start with the text shown at the left end.
    StartTextSpan(String),
    StopTextSpan,
    /// Markup attached above the leaf.
    Markup(String),
    /// An opaque LilyPond fragment placed on its own line before the leaf.
    Literal(String),
    /// Bar line glyph, e.g. "|.", "||".
    BarLine(String),
}

impl Indicator {
    /// Whether this indicator is emitted before the leaf (own line)
    /// rather than after it.
    pub fn is_prefix(&self) -> bool {
        matches!(self, Indicator::Clef(_) | Indicator::Literal(_))
    }

    /// Whether the indicator persists across segment boundaries and is a
    /// candidate for reapplication at the next segment's first leaf.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Indicator::Clef(_) | Indicator::Dynamic(_))
    }

    /// LilyPond text for this indicator.
    pub fn lilypond(&self) -> String {
        match self {
            Indicator::Dynamic(name) => format!("\\{}", name),
            Indicator::Articulation(name) => format!("-\\{}", name),
            Indicator::Clef(clef) => format!("\\clef \"{}\"", clef.name()),
            Indicator::StartHairpin(shape) => format!("\\{}", shape),
            Indicator::StopHairpin => "\\!".to_string(),
            Indicator::StartTextSpan(text) => format!(
                "- \\tweak bound-details.left.text \\markup {{ {} }} \\startTextSpan",
                text
            ),
            Indicator::StopTextSpan => "\\stopTextSpan".to_string(),
            Indicator::Markup(text) => format!("^\\markup {{ {} }}", text),
            Indicator::Literal(text) => text.clone(),
            Indicator::BarLine(glyph) => format!("\\bar \"{}\"", glyph),
        }
    }
}

/// An indicator attached to a leaf, with provenance tags.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Wrapper {
    pub indicator: Indicator,
    pub tags: Vec<Tag>,
    /// Deactivated wrappers render as commented-out lines.
    #[serde(default)]
    pub deactivate: bool,
}

impl Wrapper {
    pub fn new(indicator: Indicator) -> Self {
        Wrapper {
            indicator,
            tags: Vec::new(),
            deactivate: false,
        }
    }

    pub fn with_tags(indicator: Indicator, tags: Vec<Tag>) -> Self {
        Wrapper {
            indicator,
            tags,
            deactivate: false,
        }
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }
}
