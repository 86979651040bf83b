//! LilyPond notation generation
//!
//! Converts the score model to LilyPond source lines: leaves with their
//! attached wrappers, tuplet brackets from the voice's tuplet spans, and
//! one staff per voice. Tagged wrappers carry `%!` trailers and
//! deactivated wrappers render as `%@%`-commented lines, so a later
//! build step can toggle them without re-running the composition.

use crate::models::{Duration, Leaf, LeafKind, Score, Voice, Wrapper};

use super::RenderError;

/// Render every voice of a score as parallel staves content.
pub fn render_staves(score: &Score) -> Result<String, RenderError> {
    let mut staves = Vec::new();
    for voice in &score.voices {
        staves.push(render_staff(voice)?);
    }
    Ok(staves.join("\n"))
}

/// Render one voice wrapped in its staff and voice contexts.
pub fn render_staff(voice: &Voice) -> Result<String, RenderError> {
    let music = render_music(voice, 8)?;
    Ok(format!(
        "    \\new Staff = \"{name}\" {{\n      \\new Voice = \"{name}\" {{\n{music}\n      }}\n    }}",
        name = voice.name,
        music = music,
    ))
}

/// Render a voice's leaves at the given indentation depth.
pub fn render_music(voice: &Voice, indent: usize) -> Result<String, RenderError> {
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    for (index, leaf) in voice.leaves.iter().enumerate() {
        let tuplet = voice.tuplet_at(index).copied();
        if let Some(span) = tuplet {
            if span.start == index && !is_trivial(span.multiplier) {
                let (actual, normal) = tuplet_ratio(span.multiplier);
                lines.push(format!("{}\\tuplet {}/{} {{", pad, actual, normal));
            }
        }
        let body_pad = match tuplet {
            Some(span) if !is_trivial(span.multiplier) => format!("{}  ", pad),
            _ => pad.clone(),
        };
        for line in leaf_lines(leaf)? {
            lines.push(format!("{}{}", body_pad, line));
        }
        if let Some(span) = tuplet {
            if span.end == index && !is_trivial(span.multiplier) {
                lines.push(format!("{}}}", pad));
            }
        }
    }
    Ok(lines.join("\n"))
}

fn is_trivial(multiplier: Duration) -> bool {
    multiplier == Duration::new(1, 1)
}

/// LilyPond `\tuplet actual/normal` terms for a sounding/written
/// multiplier.
fn tuplet_ratio(multiplier: Duration) -> (i64, i64) {
    (multiplier.denominator(), multiplier.numerator())
}

/// All output lines for one leaf: prefix wrappers, the leaf itself with
/// inline suffix indicators, then deactivated wrappers.
fn leaf_lines(leaf: &Leaf) -> Result<Vec<String>, RenderError> {
    let mut lines = Vec::new();

    for wrapper in &leaf.wrappers {
        if wrapper.indicator.is_prefix() && !wrapper.deactivate {
            lines.push(tagged_line(wrapper.indicator.lilypond(), wrapper));
        }
    }

    let mut body = leaf_body(leaf)?;
    if leaf.tie {
        body.push_str(" ~");
    }
    let mut suffix_tags: Vec<String> = Vec::new();
    for wrapper in &leaf.wrappers {
        if wrapper.indicator.is_prefix() || wrapper.deactivate {
            continue;
        }
        body.push(' ');
        body.push_str(&wrapper.indicator.lilypond());
        for tag in &wrapper.tags {
            let trailer = format!("%! {}", tag);
            if !suffix_tags.contains(&trailer) {
                suffix_tags.push(trailer);
            }
        }
    }
    if !suffix_tags.is_empty() {
        body.push(' ');
        body.push_str(&suffix_tags.join(" "));
    }
    lines.push(body);

    for wrapper in &leaf.wrappers {
        if wrapper.deactivate {
            lines.push(format!(
                "%@% {}",
                tagged_line(wrapper.indicator.lilypond(), wrapper)
            ));
        }
    }
    Ok(lines)
}

fn tagged_line(text: String, wrapper: &Wrapper) -> String {
    if wrapper.tags.is_empty() {
        return text;
    }
    let tags: Vec<String> = wrapper.tags.iter().map(|t| format!("%! {}", t)).collect();
    format!("{} {}", text, tags.join(" "))
}

/// The leaf's own text: pitch(es) plus duration.
fn leaf_body(leaf: &Leaf) -> Result<String, RenderError> {
    let duration = leaf
        .duration
        .lilypond_string()
        .ok_or(RenderError::UnassignableDuration(leaf.duration))?;
    let body = match leaf.kind {
        LeafKind::Note => {
            let pitch = leaf
                .pitches
                .first()
                .ok_or_else(|| RenderError::MalformedLeaf("note without pitch".to_string()))?;
            format!("{}{}", pitch.lilypond_name(), duration)
        }
        LeafKind::Chord => {
            if leaf.pitches.is_empty() {
                return Err(RenderError::MalformedLeaf("chord without pitches".to_string()));
            }
            let names: Vec<String> = leaf.pitches.iter().map(|p| p.lilypond_name()).collect();
            format!("<{}>{}", names.join(" "), duration)
        }
        LeafKind::Rest => format!("r{}", duration),
        LeafKind::Skip => format!("s{}", duration),
    };
    Ok(body)
}

/// Escape a string for a LilyPond double-quoted field.
pub fn escape_lilypond_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Indicator, NumberedPitch, Tag};

    #[test]
    fn test_leaf_bodies() {
        let note = Leaf::note(NumberedPitch(0), Duration::new(1, 4));
        assert_eq!(leaf_body(&note).unwrap(), "c'4");
        let chord = Leaf::chord(
            vec![NumberedPitch(0), NumberedPitch(4)],
            Duration::new(1, 8),
        );
        assert_eq!(leaf_body(&chord).unwrap(), "<c' e'>8");
        let rest = Leaf::rest(Duration::new(3, 16));
        assert_eq!(leaf_body(&rest).unwrap(), "r8.");
    }

    #[test]
    fn test_tuplet_brackets() {
        let mut voice = Voice::new("Music_Voice");
        voice.add_tuplet(
            vec![
                Leaf::note(NumberedPitch(0), Duration::new(1, 8)),
                Leaf::note(NumberedPitch(2), Duration::new(1, 8)),
                Leaf::note(NumberedPitch(4), Duration::new(1, 8)),
            ],
            Duration::new(2, 3),
        );
        let music = render_music(&voice, 0).unwrap();
        assert!(music.starts_with("\\tuplet 3/2 {"));
        assert!(music.ends_with("}"));
    }

    #[test]
    fn test_tagged_and_deactivated_wrappers() {
        let mut leaf = Leaf::note(NumberedPitch(0), Duration::new(1, 4));
        leaf.attach(
            Indicator::Dynamic("p".to_string()),
            vec![Tag::new("DYNAMICS")],
            false,
        );
        leaf.attach(
            Indicator::Markup("molto".to_string()),
            vec![Tag::new("MARKUP")],
            true,
        );
        let lines = leaf_lines(&leaf).unwrap();
        assert_eq!(lines[0], "c'4 \\p %! DYNAMICS");
        assert_eq!(lines[1], "%@% ^\\markup { molto } %! MARKUP");
    }
}
