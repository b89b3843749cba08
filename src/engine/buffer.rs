//! PCM Buffer
//!
//! Planar 32-bit float sample storage shared by intake, the graph processor,
//! the renderers and the codec.

use crate::error::{EchoClipError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used when a caller does not provide one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Largest channel count the pipeline accepts (mono or stereo)
pub const MAX_CHANNELS: usize = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// PCM Buffer
// ============================================================================

/// Multi-channel floating point PCM audio
///
/// Samples are stored non-interleaved, one `Vec<f32>` per channel, nominally
/// in [-1.0, 1.0]. A buffer handed out by a renderer is never mutated again;
/// consumers only read it.
///
/// # Example
/// ```
/// use echoclip::engine::{ChannelLayout, PcmBuffer};
///
/// let buffer = PcmBuffer::silence(44100, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Create a zeroed buffer
    ///
    /// # Arguments
    /// * `num_samples` - Number of samples per channel
    /// * `layout` - Channel configuration (Mono or Stereo)
    /// * `sample_rate` - Sample rate in Hz
    pub fn silence(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Create a buffer from planar channel data
    ///
    /// All channels must have the same length, and there must be one or two
    /// of them.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if ChannelLayout::from_count(channels.len()).is_none() {
            return Err(EchoClipError::UnsupportedFormat {
                format: format!(
                    "{}-channel audio (only mono/stereo supported)",
                    channels.len()
                ),
            });
        }

        if sample_rate == 0 {
            return Err(EchoClipError::InvalidParameter {
                param: "sample_rate".to_string(),
                value: sample_rate.to_string(),
                expected: "> 0 Hz".to_string(),
            });
        }

        let len = channels[0].len();
        if channels.iter().any(|ch| ch.len() != len) {
            return Err(EchoClipError::InvalidParameter {
                param: "channels".to_string(),
                value: format!(
                    "lengths {:?}",
                    channels.iter().map(Vec::len).collect::<Vec<_>>()
                ),
                expected: "equal length per channel".to_string(),
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Channel count of the interleaved data
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 || interleaved.len() % num_channels != 0 {
            return Err(EchoClipError::Decode {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.num_channels() * self.len());
        for frame in 0..self.len() {
            for channel in &self.channels {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Get the channel layout
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::from_count(self.num_channels()).unwrap_or_default()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// All channels, in order
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Get a sample at the specified channel and index
    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f32> {
        self.channels
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Peak level across all channels in dB
    pub fn peak_db(&self) -> f32 {
        let peak = self
            .channels
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max);
        linear_to_db(peak)
    }

    /// RMS level across all channels in dB
    pub fn rms_db(&self) -> f32 {
        let total = self.num_channels() * self.len();
        if total == 0 {
            return f32::NEG_INFINITY;
        }

        let sum_squares: f64 = self
            .channels
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();

        linear_to_db((sum_squares / total as f64).sqrt() as f32)
    }

    /// Convert to another sample rate by linear interpolation
    ///
    /// The duration is kept: the output has `round(len * target / source)`
    /// frames. A matching rate returns a plain copy.
    pub fn resampled(&self, target_rate: u32) -> PcmBuffer {
        if target_rate == self.sample_rate || target_rate == 0 || self.is_empty() {
            return self.clone();
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.len() as f64) / ratio).round() as usize;
        let channels = self
            .channels
            .iter()
            .map(|samples| {
                let last = samples.len() - 1;
                (0..out_len)
                    .map(|i| {
                        let pos = i as f64 * ratio;
                        let idx = (pos.floor() as usize).min(last);
                        let frac = (pos - idx as f64) as f32;
                        let a = samples[idx];
                        let b = samples[(idx + 1).min(last)];
                        a + (b - a) * frac
                    })
                    .collect()
            })
            .collect();

        PcmBuffer {
            channels,
            sample_rate: target_rate,
        }
    }
}

/// Generate a mono sine tone, mostly for tests and demos
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `amplitude` - Peak amplitude
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz
pub fn sine_tone(frequency: f32, amplitude: f32, duration_secs: f32, sample_rate: u32) -> PcmBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples = (0..num_samples)
        .map(|i| amplitude * (angular_freq * i as f32).sin())
        .collect();

    PcmBuffer {
        channels: vec![samples],
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_silence() {
        let buffer = PcmBuffer::silence(100, ChannelLayout::Mono, 48000);
        assert_eq!(buffer.num_channels(), 1);
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.peak_db(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0];
        let buffer = PcmBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();
        assert_eq!(buffer.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.channel(1), &[5.0, 6.0, 7.0]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_rejects_multichannel() {
        let result = PcmBuffer::from_channels(vec![vec![0.0; 4]; 6], 48000);
        assert!(matches!(
            result,
            Err(EchoClipError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let result = PcmBuffer::from_channels(vec![vec![0.0; 4], vec![0.0; 3]], 48000);
        assert!(result.is_err());
    }

    #[test]
    fn test_resample_keeps_duration() {
        let tone = sine_tone(440.0, 0.5, 1.0, 48000);
        let down = tone.resampled(44100);
        assert_eq!(down.len(), 44100);
        assert_eq!(down.sample_rate(), 44100);
        assert_relative_eq!(down.duration_secs(), tone.duration_secs(), epsilon = 1e-3);
        assert_relative_eq!(down.rms_db(), tone.rms_db(), epsilon = 0.1);

        let up = PcmBuffer::from_channels(vec![vec![0.0, 1.0], vec![1.0, 1.0]], 1000).unwrap();
        let up = up.resampled(2000);
        assert_eq!(up.channel(0), &[0.0, 0.5, 1.0, 1.0]);
        assert_eq!(up.channel(1), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_resample_same_rate_is_copy() {
        let tone = sine_tone(440.0, 0.5, 0.01, 8000);
        assert_eq!(tone.resampled(8000), tone);
    }

    #[test]
    fn test_sine_rms() {
        let tone = sine_tone(441.0, 1.0, 1.0, 44100);
        // RMS of a full-scale sine is -3.01 dB
        assert_relative_eq!(tone.rms_db(), -3.01, epsilon = 0.05);
        assert_relative_eq!(tone.duration_secs(), 1.0, epsilon = 1e-9);
    }
}
