// Test registration commands: direct registration, octave-target
// interpolation, and staff-position interpolation with pinned endpoints.

use baton::api;
use baton::commands::Runtime;
use baton::models::{Clef, Duration, Indicator, Leaf, NumberedPitch, Voice};

fn notes_with_pitches(numbers: &[i64]) -> Voice {
    let mut voice = Voice::new("Music_Voice");
    for &n in numbers {
        voice.add_leaf(Leaf::note(NumberedPitch(n), Duration::new(1, 8)));
    }
    voice
}

fn written_pitches(voice: &Voice) -> Vec<i64> {
    voice.leaves.iter().map(|l| l.pitches[0].0).collect()
}

#[test]
fn test_register_moves_pitch_class_into_octave() {
    let mut voice = notes_with_pitches(&[0, 11, 14]);
    let command = api::register(-12).unwrap();
    command.call(Some(&mut voice), &Runtime::default()).unwrap();
    // Every pitch keeps its class, relocated into the octave on C3.
    assert_eq!(written_pitches(&voice), vec![-12, -1, -10]);
}

#[test]
fn test_register_components_first_match_wins() {
    let mut voice = notes_with_pitches(&[-5, 5]);
    let command = api::register_components(&[(-48, 0, 12), (-48, 48, -24)]).unwrap();
    command.call(Some(&mut voice), &Runtime::default()).unwrap();
    assert_eq!(written_pitches(&voice), vec![19, -19]);
}

#[test]
fn test_register_interpolation_endpoints() {
    // Five groups between octaves on C3 and C5: group 0 must land
    // exactly in the start octave, later groups climb linearly.
    let mut voice = notes_with_pitches(&[0, 0, 0, 0, 0]);
    let command = api::register_interpolation(-12, 12).unwrap();
    command.call(Some(&mut voice), &Runtime::default()).unwrap();
    let pitches = written_pitches(&voice);
    assert_eq!(pitches[0], -12);
    assert_eq!(pitches[4], 12);
    // Monotonic climb between the endpoints.
    for window in pitches.windows(2) {
        assert!(window[0] <= window[1]);
    }
}

#[test]
fn test_register_interpolation_single_group_uses_start() {
    let mut voice = notes_with_pitches(&[7]);
    let command = api::register_interpolation(-24, 24).unwrap();
    command.call(Some(&mut voice), &Runtime::default()).unwrap();
    assert_eq!(written_pitches(&voice), vec![-17]);
}

#[test]
fn test_staff_position_interpolation_pins_endpoints() {
    let mut voice = notes_with_pitches(&[3, 3, 3, 3, 3, 3]);
    let command = api::staff_positions_interpolation(1, 13).unwrap();
    command.call(Some(&mut voice), &Runtime::default()).unwrap();
    let pitches = written_pitches(&voice);
    // Endpoints are the given pitches exactly, even though the
    // interpolated curve only visits white keys.
    assert_eq!(pitches[0], 1);
    assert_eq!(pitches[5], 13);
    for window in pitches.windows(2) {
        assert!(window[0] <= window[1]);
    }
}

#[test]
fn test_staff_position_interpolation_respects_clef() {
    let mut treble = notes_with_pitches(&[0, 0, 0]);
    let command = api::staff_positions_interpolation(0, 12).unwrap();
    command.call(Some(&mut treble), &Runtime::default()).unwrap();

    let mut bass = notes_with_pitches(&[0, 0, 0]);
    bass.leaves[0].attach(Indicator::Clef(Clef::Bass), vec![], false);
    command.call(Some(&mut bass), &Runtime::default()).unwrap();

    // Both runs pin the endpoints; the middle group interpolates in
    // staff-position space, which is clef-relative but lands on the
    // same white keys for the same pitch endpoints.
    assert_eq!(written_pitches(&treble)[0], 0);
    assert_eq!(written_pitches(&bass)[0], 0);
    assert_eq!(written_pitches(&treble)[2], 12);
    assert_eq!(written_pitches(&bass)[2], 12);
}
