use serde::{Deserialize, Serialize};

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Ceiling of the hard clipping curve.
const HARD_CEILING: f32 = 0.8;

/// Transfer curve of the waveshaper.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    /// `tanh`, warm saturation.
    Soft,
    /// Flat clip at ±0.8.
    Hard,
    /// Pre-gain only.
    Clean,
}

impl Curve {
    #[inline]
    fn shape(self, x: f32) -> f32 {
        match self {
            Curve::Soft => x.tanh(),
            Curve::Hard => x.clamp(-HARD_CEILING, HARD_CEILING),
            Curve::Clean => x,
        }
    }
}

/// Waveshaping distortion.
///
/// # Parameters
/// - `drive`: 0 is clean, 1 is heavy. Scales the pre-gain `1 + 10 * drive`.
/// - `curve`: nonlinearity applied after the pre-gain.
///
/// # Returns
/// The shaped signal clipped to full scale.
pub fn waveshaper(buffer: &Buffer, drive: f32, curve: Curve) -> Result<Buffer> {
    if !(drive >= 0.0) || !drive.is_finite() {
        return Err(Error::invalid("drive", drive, "a drive >= 0"));
    }
    let pre_gain = 1.0 + drive * 10.0;
    Ok(buffer.map(|x| curve.shape(x * pre_gain).clamp(-1.0, 1.0)))
}

/// Reduce amplitude resolution to `2^bit_depth` steps per unit.
///
/// # Parameters
/// - `bit_depth`: 16 is clean, 8 lo-fi, 4 extreme. Must be in 1..=16.
pub fn bit_crush(buffer: &Buffer, bit_depth: u32) -> Result<Buffer> {
    if !(1..=16).contains(&bit_depth) {
        return Err(Error::invalid("bit_depth", bit_depth, "a bit depth in 1..=16"));
    }
    let levels = 2f32.powi(bit_depth as i32);
    Ok(buffer.map(|x| (x * levels).round() / levels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SR;
    use crate::time_forms::sine;
    use std::collections::HashSet;

    fn distinct(b: &Buffer) -> usize {
        b.samples().iter().map(|x| x.to_bits()).collect::<HashSet<_>>().len()
    }

    #[test]
    fn test_bit_crush_reduces_distinct_values() {
        let input = Buffer::mono(sine(440.0, 0.1, SR), SR).unwrap().gain(-1.0);
        let eight = bit_crush(&input, 8).unwrap();
        let four = bit_crush(&input, 4).unwrap();
        assert!(distinct(&four) < distinct(&eight));
        assert!(distinct(&eight) < distinct(&input));
        assert!(distinct(&four) <= 33);
    }

    #[test]
    fn test_bit_crush_bounds() {
        let input = Buffer::mono(vec![0.3], SR).unwrap();
        assert!(bit_crush(&input, 0).is_err());
        assert!(bit_crush(&input, 17).is_err());
        assert_eq!(bit_crush(&input, 1).unwrap().samples(), &[0.5]);
    }

    #[test]
    fn test_soft_curve_saturates() {
        let input = Buffer::mono(vec![0.0, 0.05, 0.5, -0.5], SR).unwrap();
        let out = waveshaper(&input, 1.0, Curve::Soft).unwrap();
        assert_eq!(out.samples()[0], 0.0);
        assert!((out.samples()[1] - 0.55f32.tanh()).abs() < 1e-6);
        assert!(out.samples()[2] > 0.99 && out.samples()[2] <= 1.0);
        assert!(out.samples()[3] < -0.99);
    }

    #[test]
    fn test_hard_curve_clips_at_ceiling() {
        let input = Buffer::mono(vec![0.01, 0.2, -0.9], SR).unwrap();
        let out = waveshaper(&input, 0.7, Curve::Hard).unwrap();
        assert!((out.samples()[0] - 0.08).abs() < 1e-6);
        assert_eq!(out.samples()[1], 0.8);
        assert_eq!(out.samples()[2], -0.8);
    }

    #[test]
    fn test_clean_curve_still_clips_full_scale() {
        let input = Buffer::mono(vec![0.05, 0.5], SR).unwrap();
        let out = waveshaper(&input, 0.5, Curve::Clean).unwrap();
        assert!((out.samples()[0] - 0.3).abs() < 1e-6);
        assert_eq!(out.samples()[1], 1.0);
        assert!(waveshaper(&input, -0.1, Curve::Soft).is_err());
    }
}
