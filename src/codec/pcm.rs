//! Float to 16-bit integer sample conversion
//!
//! Both containers share one conversion rule: clamp to [-1, 1], then scale
//! negative values by 32768 and non-negative values by 32767. The asymmetric
//! scale reaches -32768 at -1.0 without overflowing at +1.0. Exported byte
//! values depend on it, so it must not be replaced by a symmetric scale.

/// Scale applied to negative samples
const NEGATIVE_SCALE: f32 = 32768.0;

/// Scale applied to zero and positive samples
const POSITIVE_SCALE: f32 = 32767.0;

/// Convert one float sample to a signed 16-bit integer
///
/// The scaled value is truncated toward zero.
#[inline]
pub fn float_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * NEGATIVE_SCALE) as i16
    } else {
        (s * POSITIVE_SCALE) as i16
    }
}

/// Convert a whole channel
pub fn channel_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| float_to_i16(s)).collect()
}
