// Test segment orchestration: command sequencing, persisted state
// across segments, reapplied indicators, layout maps and rendering.

use std::io::Write;

use baton::api;
use baton::models::{Clef, Duration, Indicator, Leaf, NumberedPitch, Tag, TimeSignature, Voice};
use baton::segments::{CommandScope, SegmentMaker, GLOBAL_SKIPS, REAPPLIED_TAG};
use baton::select::Selector;

const VOICE: &str = "Music_Voice";

fn quarter_notes(count: usize) -> Voice {
    let mut voice = Voice::new(VOICE);
    for _ in 0..count {
        voice.add_leaf(Leaf::note(NumberedPitch(0), Duration::new(1, 4)));
    }
    voice
}

fn written_pitches(maker: &SegmentMaker) -> Vec<i64> {
    maker
        .score()
        .voice(VOICE)
        .unwrap()
        .leaves
        .iter()
        .map(|l| l.pitches[0].0)
        .collect()
}

#[test]
fn test_commands_run_in_composer_order() {
    let mut maker = SegmentMaker::new("01", vec![TimeSignature::new(4, 4)]);
    maker.add_voice(quarter_notes(4));
    // Registration reads what pitch assignment wrote, so order matters.
    maker.add_command(
        CommandScope::voice(VOICE),
        api::pitches(&[12, 14, 16, 17]).unwrap(),
    );
    maker.add_command(CommandScope::voice(VOICE), api::register(-12).unwrap());
    maker.run().unwrap();
    assert_eq!(written_pitches(&maker), vec![-12, -10, -8, -7]);
}

#[test]
fn test_state_threads_across_segments() {
    let payload = [0, 2, 4, 5, 7];

    let mut first = SegmentMaker::new("01", vec![TimeSignature::new(3, 4)]);
    first.add_voice(quarter_notes(3));
    first.add_command(
        CommandScope::voice(VOICE),
        api::pitches_persistent(&payload, "music.pitches").unwrap(),
    );
    first.run().unwrap();
    assert_eq!(written_pitches(&first), vec![0, 2, 4]);

    // The metadata mapping is the only thing the next pass receives.
    let serialized = serde_json::to_string(first.metadata()).unwrap();
    let restored = serde_json::from_str(&serialized).unwrap();

    let mut second = SegmentMaker::new("02", vec![TimeSignature::new(3, 4)]);
    second.set_previous_metadata(restored);
    second.add_voice(quarter_notes(3));
    second.add_command(
        CommandScope::voice(VOICE),
        api::pitches_persistent(&payload, "music.pitches").unwrap(),
    );
    second.run().unwrap();
    // Resumes at index 3 and wraps.
    assert_eq!(written_pitches(&second), vec![5, 7, 0]);
}

#[test]
fn test_persistent_indicators_reapply_once() {
    let mut first = SegmentMaker::new("01", vec![TimeSignature::new(2, 4)]);
    let mut voice = quarter_notes(2);
    voice.leaves[0].attach(Indicator::Clef(Clef::Bass), vec![], false);
    first.add_voice(voice);
    first.run().unwrap();

    let mut second = SegmentMaker::new("02", vec![TimeSignature::new(2, 4)]);
    second.set_previous_metadata(first.metadata().clone());
    second.add_voice(quarter_notes(2));
    second.run().unwrap();

    let first_leaf = &second.score().voice(VOICE).unwrap().leaves[0];
    let reapplied: Vec<_> = first_leaf
        .wrappers
        .iter()
        .filter(|w| w.has_tag(&Tag::new(REAPPLIED_TAG)))
        .collect();
    assert_eq!(reapplied.len(), 1);
    assert_eq!(reapplied[0].indicator, Indicator::Clef(Clef::Bass));

    // A third segment that already states the clef explicitly gets no
    // duplicate reapplication.
    let mut third = SegmentMaker::new("03", vec![TimeSignature::new(2, 4)]);
    third.set_previous_metadata(second.metadata().clone());
    let mut voice = quarter_notes(2);
    voice.leaves[0].attach(Indicator::Clef(Clef::Bass), vec![], false);
    third.add_voice(voice);
    third.run().unwrap();
    let first_leaf = &third.score().voice(VOICE).unwrap().leaves[0];
    let reapplied = first_leaf
        .wrappers
        .iter()
        .filter(|w| w.has_tag(&Tag::new(REAPPLIED_TAG)))
        .count();
    assert_eq!(reapplied, 0);
}

#[test]
fn test_register_from_manifest() {
    let mut maker = SegmentMaker::new("01", vec![TimeSignature::new(4, 4)]);
    maker.add_voice(quarter_notes(4));
    let registration = baton::Registration::single(NumberedPitch(12));
    maker.add_manifest("cello.registration", serde_json::to_value(registration).unwrap());
    maker.add_command(
        CommandScope::voice(VOICE),
        api::register_from_manifest("cello.registration").unwrap(),
    );
    maker.run().unwrap();
    assert_eq!(written_pitches(&maker), vec![12, 12, 12, 12]);
}

#[test]
fn test_unknown_voice_raises() {
    let mut maker = SegmentMaker::new("01", vec![TimeSignature::new(4, 4)]);
    maker.add_command(CommandScope::voice("Nobody"), api::register(0).unwrap());
    assert!(maker.run().is_err());
}

#[test]
fn test_layout_maps_annotate_the_skip_track() {
    let mut maker = SegmentMaker::new(
        "01",
        vec![TimeSignature::new(4, 4), TimeSignature::new(3, 4)],
    );
    maker.add_voice(quarter_notes(7));
    maker.set_breaks(api::breaks(&[(2, 40, &[12, 10])]).unwrap());
    maker.set_spacing(api::spacing(Some((1, 12)), &[(2, (1, 16))]).unwrap());
    maker.run().unwrap();

    let skips = maker.score().voice(GLOBAL_SKIPS).unwrap();
    assert_eq!(skips.leaves.len(), 2);
    let second: Vec<String> = skips.leaves[1]
        .wrappers
        .iter()
        .map(|w| w.indicator.lilypond())
        .collect();
    assert!(second.iter().any(|t| t == "\\break"));
    assert!(second.iter().any(|t| t.contains("ly:make-moment 1/16")));
    let first: Vec<String> = skips.leaves[0]
        .wrappers
        .iter()
        .map(|w| w.indicator.lilypond())
        .collect();
    assert!(first.iter().any(|t| t.contains("ly:make-moment 1/12")));
    assert!(first.iter().any(|t| t == "\\time 4/4"));
}

#[test]
fn test_render_writes_complete_document() {
    let mut maker = SegmentMaker::new("01", vec![TimeSignature::new(2, 4)]);
    maker.add_voice(quarter_notes(2));
    maker.add_command(
        CommandScope::voice(VOICE),
        api::pitches(&[0, 4]).unwrap(),
    );
    maker.add_command(
        CommandScope::voice(VOICE),
        api::dynamics(&["p"])
            .unwrap()
            .with_selector(Selector::leaves().index(0)),
    );
    maker.run().unwrap();

    let document = maker.render(Some("Archipelago")).unwrap();
    assert!(document.contains("\\version"));
    assert!(document.contains("Archipelago"));
    assert!(document.contains("\\time 2/4"));
    assert!(document.contains("c'4"));
    assert!(document.contains("e'4"));
    assert!(document.contains("\\p %! 01"));
    assert!(document.contains("\\bar \"|.\""));

    // The document is plain text a build runner can write to disk.
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(document.as_bytes()).unwrap();
    assert!(file.path().exists());
}
