//! Pitch representation and conversion logic
//!
//! Numbered pitches count semitones from middle C (0 = C4). Staff
//! positions count diatonic steps relative to a clef's middle line,
//! which is what the staff-position interpolation commands work in.

use serde::{Deserialize, Serialize};

/// A pitch as a signed semitone count, 0 = middle C.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumberedPitch(pub i64);

impl NumberedPitch {
    /// Pitch class in 0..12.
    pub fn pitch_class(&self) -> i64 {
        ((self.0 % 12) + 12) % 12
    }

    /// Octave number, C4 = 4 (middle C octave).
    pub fn octave(&self) -> i64 {
        4 + self.0.div_euclid(12)
    }

    /// Transpose by a signed semitone interval.
    pub fn transpose(&self, semitones: i64) -> NumberedPitch {
        NumberedPitch(self.0 + semitones)
    }

    /// Diatonic step number, 0 = C4, 1 = D4, 7 = C5, -1 = B3.
    ///
    /// Chromatic pitches round down to the white key below (sharp
    /// spelling), matching the LilyPond names this crate emits.
    pub fn diatonic_number(&self) -> i64 {
        let octave = self.0.div_euclid(12);
        let class = self.pitch_class();
        octave * 7 + white_index(class)
    }

    /// The white-key pitch at a diatonic step number.
    pub fn from_diatonic(diatonic: i64) -> NumberedPitch {
        let octave = diatonic.div_euclid(7);
        let step = diatonic.rem_euclid(7);
        NumberedPitch(octave * 12 + WHITE_SEMITONES[step as usize])
    }

    /// Staff position of this pitch under the given clef.
    pub fn staff_position(&self, clef: Clef) -> StaffPosition {
        StaffPosition(self.diatonic_number() - clef.middle_line_diatonic())
    }

    /// LilyPond absolute note name (e.g. 0 → "c'", -12 → "c", 13 → "cis''").
    pub fn lilypond_name(&self) -> String {
        let class_name = match self.pitch_class() {
            0 => "c",
            1 => "cis",
            2 => "d",
            3 => "dis",
            4 => "e",
            5 => "f",
            6 => "fis",
            7 => "g",
            8 => "gis",
            9 => "a",
            10 => "ais",
            11 => "b",
            _ => unreachable!(),
        };
        // LilyPond's unmarked octave starts at C3; middle C is c'.
        let marks = self.0.div_euclid(12) + 1;
        let mut name = String::from(class_name);
        if marks >= 0 {
            for _ in 0..marks {
                name.push('\'');
            }
        } else {
            for _ in 0..(-marks) {
                name.push(',');
            }
        }
        name
    }
}

fn white_index(pitch_class: i64) -> i64 {
    match pitch_class {
        0 | 1 => 0,
        2 | 3 => 1,
        4 => 2,
        5 | 6 => 3,
        7 | 8 => 4,
        9 | 10 => 5,
        11 => 6,
        _ => unreachable!(),
    }
}

/// Semitone offsets of the white keys within one octave.
const WHITE_SEMITONES: [i64; 7] = [0, 2, 4, 5, 7, 9, 11];

/// A diatonic staff position relative to a clef's middle line.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StaffPosition(pub i64);

impl StaffPosition {
    /// The white-key pitch sitting at this staff position under `clef`.
    pub fn to_pitch(&self, clef: Clef) -> NumberedPitch {
        let diatonic = self.0 + clef.middle_line_diatonic();
        let octave = diatonic.div_euclid(7);
        let step = diatonic.rem_euclid(7);
        NumberedPitch(octave * 12 + WHITE_SEMITONES[step as usize])
    }
}

/// Clefs the registration commands understand.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Clef {
    #[default]
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl Clef {
    /// Diatonic number (0 = C4) of the staff's middle line.
    fn middle_line_diatonic(&self) -> i64 {
        match self {
            // Treble: B4 on the middle line.
            Clef::Treble => 6,
            // Bass: D3.
            Clef::Bass => -6,
            // Alto: C4.
            Clef::Alto => 0,
            // Tenor: A3.
            Clef::Tenor => -2,
            Clef::Percussion => 0,
        }
    }

    /// LilyPond clef name.
    pub fn name(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Percussion => "percussion",
        }
    }

    /// Parse a LilyPond clef name.
    pub fn parse(name: &str) -> Option<Clef> {
        match name {
            "treble" => Some(Clef::Treble),
            "bass" => Some(Clef::Bass),
            "alto" => Some(Clef::Alto),
            "tenor" => Some(Clef::Tenor),
            "percussion" => Some(Clef::Percussion),
            _ => None,
        }
    }
}
