// Test the talea rhythm-maker: cursor bookkeeping, figure shapes and
// time treatments.

use baton::models::{Duration, LeafKind, NumberedPitch};
use baton::rhythm::{PitchFirstRhythmMaker, PitchToken, RhythmState, Talea, TimeTreatment};

fn pitch_tokens(numbers: &[i64]) -> Vec<PitchToken> {
    numbers
        .iter()
        .map(|&n| PitchToken::Pitch(NumberedPitch(n)))
        .collect()
}

fn make_maker(counts: Vec<i64>, denominator: i64, treatments: Vec<TimeTreatment>) -> PitchFirstRhythmMaker {
    let talea = Talea::new(counts, denominator).expect("valid talea");
    PitchFirstRhythmMaker::new(talea, treatments).expect("valid maker")
}

#[test]
fn test_single_collection_scenario() {
    // counts [1, 1, 2] over 16 applied to [[0, 2, 10]]: four talea units
    // consumed, three pitched leaves in ratio 1:1:2.
    let maker = make_maker(vec![1, 1, 2], 16, vec![]);
    let collections = vec![pitch_tokens(&[0, 2, 10])];
    let (figures, state) = maker.call(&collections, None).unwrap();

    assert_eq!(state.next_attack, 4);
    assert_eq!(state.next_segment, 1);

    let leaves = &figures[0].leaves;
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves[0].duration, Duration::new(1, 16));
    assert_eq!(leaves[1].duration, Duration::new(1, 16));
    assert_eq!(leaves[2].duration, Duration::new(1, 8));
    assert_eq!(leaves[0].pitches[0], NumberedPitch(0));
    assert_eq!(leaves[1].pitches[0], NumberedPitch(2));
    assert_eq!(leaves[2].pitches[0], NumberedPitch(10));
}

#[test]
fn test_cursor_monotonicity_across_collections() {
    let maker = make_maker(vec![2, -1, 3], 16, vec![]);
    let collections = vec![
        pitch_tokens(&[0, 2]),
        vec![],
        pitch_tokens(&[4]),
    ];
    let (figures, state) = maker.call(&collections, None).unwrap();

    // First collection: pitch 0 takes the 2, the -1 becomes a rest,
    // pitch 2 takes the 3; six units in all.
    assert_eq!(figures[0].leaves.len(), 3);
    assert_eq!(figures[0].leaves[1].kind, LeafKind::Rest);

    // The empty collection advances nothing.
    assert!(figures[1].leaves.is_empty());

    // Third collection resumes at the wrapped talea start.
    assert_eq!(figures[2].leaves[0].duration, Duration::new(1, 8));

    assert_eq!(state.next_attack, 8);
    assert_eq!(state.next_segment, 2);
}

#[test]
fn test_state_round_trips_through_json() {
    let maker = make_maker(vec![1, 1, 2], 16, vec![]);
    let (_, state) = maker.call(&[pitch_tokens(&[0])], None).unwrap();

    let serialized = serde_json::to_string(&state).unwrap();
    let restored: RhythmState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(restored, state);

    // A fresh call with restored state continues where the first ended.
    let (figures, state) = maker.call(&[pitch_tokens(&[2, 10])], Some(restored)).unwrap();
    assert_eq!(figures[0].leaves[1].duration, Duration::new(1, 8));
    assert_eq!(state.next_attack, 4);
}

#[test]
fn test_delta_treatment_builds_tuplet() {
    let maker = make_maker(vec![1, 1, 1], 16, vec![TimeTreatment::Delta(1)]);
    let (figures, _) = maker.call(&[pitch_tokens(&[0, 2, 4])], None).unwrap();
    // Three units stretched to four: multiplier 4/3.
    assert_eq!(figures[0].multiplier, Some(Duration::new(4, 3)));
}

#[test]
fn test_treatments_cycle_per_collection() {
    let maker = make_maker(
        vec![1],
        16,
        vec![TimeTreatment::Delta(1), TimeTreatment::Delta(0)],
    );
    let collections = vec![pitch_tokens(&[0, 2]), pitch_tokens(&[4, 5])];
    let (figures, _) = maker.call(&collections, None).unwrap();
    assert_eq!(figures[0].multiplier, Some(Duration::new(3, 2)));
    assert_eq!(figures[1].multiplier, None);
}

#[test]
fn test_accelerando_keeps_total_duration() {
    let maker = make_maker(vec![1], 16, vec![TimeTreatment::Accelerando]);
    let (figures, _) = maker.call(&[pitch_tokens(&[0, 2, 4, 5])], None).unwrap();
    let leaves = &figures[0].leaves;
    let total: Duration = leaves.iter().map(|l| l.duration).sum();
    assert_eq!(total, Duration::new(4, 16));
    assert!(leaves[0].duration > leaves[3].duration);
    assert_eq!(figures[0].multiplier, None);
}

#[test]
fn test_explicit_rest_tokens() {
    let maker = make_maker(vec![1, 1], 8, vec![]);
    let collection = vec![
        PitchToken::Pitch(NumberedPitch(0)),
        PitchToken::Rest,
        PitchToken::Chord(vec![NumberedPitch(0), NumberedPitch(4)]),
    ];
    let (figures, state) = maker.call(&[collection], None).unwrap();
    let kinds: Vec<LeafKind> = figures[0].leaves.iter().map(|l| l.kind).collect();
    assert_eq!(kinds, vec![LeafKind::Note, LeafKind::Rest, LeafKind::Chord]);
    assert_eq!(state.next_attack, 3);
}

#[test]
fn test_append_to_voice_builds_tuplet_spans() {
    use baton::models::Voice;

    let maker = make_maker(vec![1, 1, 1], 16, vec![TimeTreatment::Delta(1)]);
    let mut voice = Voice::new("Music_Voice");
    let state = maker
        .append_to_voice(&mut voice, &[pitch_tokens(&[0, 2, 4])], None)
        .unwrap();
    assert_eq!(state.next_segment, 1);
    assert_eq!(voice.leaves.len(), 3);
    assert_eq!(voice.tuplets.len(), 1);
    assert_eq!(voice.tuplets[0].multiplier, Duration::new(4, 3));
    // Sounding total: three sixteenths stretched to four.
    let total: Duration = (0..3).map(|i| voice.sounding_duration(i)).sum();
    assert_eq!(total, Duration::new(1, 4));
}
