//! Tuplet time treatments
//!
//! A time treatment reshapes the figure a collection produced: integer
//! deltas grow or shrink the tuplet by whole talea units, ratio and
//! fixed-duration treatments set the multiplier directly, and the
//! accelerando/ritardando treatments rewrite the leaf durations along an
//! exponential curve quantized to a power-of-two grid.

use serde::{Deserialize, Serialize};

use crate::models::Duration;

use super::RhythmError;

/// Denominator the accelerando multipliers are quantized to.
const QUANTIZE_DENOMINATOR: i64 = 1024;

/// One time treatment, drawn cyclically per collection.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum TimeTreatment {
    /// Grow (positive) or shrink (negative) the tuplet by whole units.
    Delta(i64),
    /// Durations shrink toward the end of the figure.
    Accelerando,
    /// Durations grow toward the end of the figure.
    Ritardando,
    /// Explicit `actual : normal` tuplet ratio, e.g. (3, 2) for a
    /// triplet.
    Ratio(i64, i64),
    /// Squeeze the figure into an explicit target duration.
    Fixed(Duration),
}

impl TimeTreatment {
    /// Validate treatment parameters; raised eagerly by the factories.
    pub fn validate(&self) -> Result<(), RhythmError> {
        match self {
            TimeTreatment::Ratio(actual, normal) if *actual <= 0 || *normal <= 0 => {
                Err(RhythmError::BadRatio(*actual, *normal))
            }
            TimeTreatment::Fixed(duration) if duration.is_zero() || duration.is_negative() => {
                Err(RhythmError::BadTargetDuration(*duration))
            }
            _ => Ok(()),
        }
    }

    /// Tuplet multiplier for a figure of `contents` talea units.
    ///
    /// Accelerando and ritardando return `None`: they act on the leaf
    /// durations instead (`interpolate_durations`).
    pub fn multiplier(&self, contents: u64, natural: Duration) -> Option<Duration> {
        match self {
            TimeTreatment::Delta(delta) => {
                let extra = clamp_delta(*delta, contents);
                if extra == 0 {
                    return None;
                }
                let contents = contents as i64;
                Some(Duration::new(contents + extra, contents))
            }
            TimeTreatment::Ratio(actual, normal) => {
                if actual == normal {
                    return None;
                }
                Some(Duration::new(*normal, *actual))
            }
            TimeTreatment::Fixed(target) => {
                if *target == natural {
                    return None;
                }
                Some(*target / natural)
            }
            TimeTreatment::Accelerando | TimeTreatment::Ritardando => None,
        }
    }
}

/// Reduce a delta modulo the figure size.
///
/// Positive deltas wrap modulo the full unit count; negative deltas wrap
/// modulo half of it (rounded up), which keeps a shrinking tuplet from
/// degenerating past half its contents. The asymmetry is inherited
/// policy; see DESIGN.md.
fn clamp_delta(delta: i64, contents: u64) -> i64 {
    let contents = contents as i64;
    if contents == 0 {
        return 0;
    }
    if delta >= 0 {
        delta % contents
    } else {
        let modulus = (contents + 1) / 2;
        if modulus == 0 {
            0
        } else {
            -((-delta) % modulus)
        }
    }
}

/// Exponentially interpolated replacement durations for an accelerando
/// or ritardando figure.
///
/// Each leaf's multiplier (interpolated over original duration) is
/// quantized to a fixed power-of-two denominator, then the quantization
/// error is shifted onto whichever of the first and last durations is
/// larger so the figure keeps its exact total.
pub fn interpolate_durations(originals: &[Duration], ritardando: bool) -> Vec<Duration> {
    let count = originals.len();
    if count < 2 {
        return originals.to_vec();
    }
    let total: Duration = originals.iter().copied().sum();
    let total_f = total.to_f64();

    // Exponential taper: the last raw duration is half (accelerando) or
    // double (ritardando) the first, scaled to preserve the total.
    let end_ratio: f64 = if ritardando { 2.0 } else { 0.5 };
    let raw: Vec<f64> = (0..count)
        .map(|i| end_ratio.powf(i as f64 / (count - 1) as f64))
        .collect();
    let raw_sum: f64 = raw.iter().sum();

    let mut result: Vec<Duration> = Vec::with_capacity(count);
    for (i, original) in originals.iter().enumerate() {
        let interpolated = total_f * raw[i] / raw_sum;
        let multiplier = interpolated / original.to_f64();
        let quantized = (multiplier * QUANTIZE_DENOMINATOR as f64).round() as i64;
        let quantized = quantized.max(1);
        result.push(*original * Duration::new(quantized, QUANTIZE_DENOMINATOR));
    }
    fix_rounding_error(&mut result, total);
    result
}

/// Adjust a duration list so it sums exactly to `total`.
///
/// The discrepancy lands on whichever of the first and last durations is
/// larger; an already-exact list is returned untouched.
pub fn fix_rounding_error(durations: &mut [Duration], total: Duration) {
    if durations.is_empty() {
        return;
    }
    let sum: Duration = durations.iter().copied().sum();
    let discrepancy = total - sum;
    if discrepancy.is_zero() {
        return;
    }
    let last = durations.len() - 1;
    if durations[0] >= durations[last] {
        durations[0] = durations[0] + discrepancy;
    } else {
        durations[last] = durations[last] + discrepancy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_modulus_asymmetry() {
        // Positive deltas wrap modulo the contents.
        assert_eq!(clamp_delta(5, 4), 1);
        assert_eq!(clamp_delta(4, 4), 0);
        // Negative deltas wrap modulo ceil(contents / 2).
        assert_eq!(clamp_delta(-1, 4), -1);
        assert_eq!(clamp_delta(-2, 4), 0);
        assert_eq!(clamp_delta(-3, 5), 0);
        assert_eq!(clamp_delta(-4, 5), -1);
    }

    #[test]
    fn test_delta_multiplier() {
        let natural = Duration::new(4, 16);
        let m = TimeTreatment::Delta(1).multiplier(4, natural);
        assert_eq!(m, Some(Duration::new(5, 4)));
        let m = TimeTreatment::Delta(-1).multiplier(4, natural);
        assert_eq!(m, Some(Duration::new(3, 4)));
        assert_eq!(TimeTreatment::Delta(4).multiplier(4, natural), None);
    }

    #[test]
    fn test_fixed_and_ratio_multipliers() {
        let natural = Duration::new(3, 8);
        let m = TimeTreatment::Fixed(Duration::new(1, 4)).multiplier(6, natural);
        assert_eq!(m, Some(Duration::new(2, 3)));
        let m = TimeTreatment::Ratio(3, 2).multiplier(3, natural);
        assert_eq!(m, Some(Duration::new(2, 3)));
        assert_eq!(TimeTreatment::Ratio(2, 2).multiplier(3, natural), None);
    }

    #[test]
    fn test_fix_rounding_error_exact_total() {
        let total = Duration::new(1, 4);
        let mut durations = vec![
            Duration::new(101, 1024),
            Duration::new(83, 1024),
            Duration::new(71, 1024),
        ];
        fix_rounding_error(&mut durations, total);
        let sum: Duration = durations.iter().copied().sum();
        assert_eq!(sum, total);
        // Largest end (the first) absorbed the discrepancy.
        assert_eq!(durations[1], Duration::new(83, 1024));
        assert_eq!(durations[2], Duration::new(71, 1024));
    }

    #[test]
    fn test_fix_rounding_error_is_noop_when_exact() {
        let total = Duration::new(1, 2);
        let mut durations = vec![Duration::new(1, 4), Duration::new(1, 4)];
        let before = durations.clone();
        fix_rounding_error(&mut durations, total);
        assert_eq!(durations, before);
    }

    #[test]
    fn test_accelerando_preserves_total_and_shrinks() {
        let originals = vec![Duration::new(1, 8); 4];
        let result = interpolate_durations(&originals, false);
        let total: Duration = result.iter().copied().sum();
        assert_eq!(total, Duration::new(1, 2));
        assert!(result[0] > result[3]);
    }

    #[test]
    fn test_ritardando_grows() {
        let originals = vec![Duration::new(1, 16); 5];
        let result = interpolate_durations(&originals, true);
        let total: Duration = result.iter().copied().sum();
        assert_eq!(total, Duration::new(5, 16));
        assert!(result[0] < result[4]);
    }
}
