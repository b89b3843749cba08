//! Biquad filter
//!
//! Second-order sections for the noise filter and the clarity filter.
//! Coefficients follow the Audio EQ Cookbook with the conventions of web
//! audio engines: lowpass Q is given in dB, peaking Q is linear.
//! `Allpass` here is a pure pass-through (unity coefficients), so switching
//! the noise filter off restores the input exactly.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Noise filter cutoff when noise reduction is enabled
pub const NOISE_FILTER_CUTOFF_HZ: f32 = 5000.0;

/// Noise filter resonance when noise reduction is enabled
pub const NOISE_FILTER_Q: f32 = 1.0;

/// Clarity filter center frequency
pub const CLARITY_CENTER_HZ: f32 = 3500.0;

/// Clarity filter bandwidth
pub const CLARITY_Q: f32 = 1.5;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiquadKind {
    /// Pass-through, no shaping
    #[default]
    Allpass,
    /// Remove above frequency
    Lowpass,
    /// Bell curve boost/cut around frequency
    Peaking,
}

/// Complete configuration of one biquad node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadConfig {
    pub kind: BiquadKind,
    /// Cutoff / center frequency in Hz
    pub frequency: f32,
    /// Resonance (dB for lowpass, linear for peaking)
    pub q: f32,
    /// Gain in dB (peaking only)
    pub gain_db: f32,
}

impl Default for BiquadConfig {
    fn default() -> Self {
        Self {
            kind: BiquadKind::Allpass,
            frequency: 350.0,
            q: 1.0,
            gain_db: 0.0,
        }
    }
}

impl BiquadConfig {
    /// Noise filter: lowpass at 5 kHz when enabled, pass-through otherwise
    pub fn noise_filter(enabled: bool) -> Self {
        Self {
            kind: if enabled {
                BiquadKind::Lowpass
            } else {
                BiquadKind::Allpass
            },
            frequency: NOISE_FILTER_CUTOFF_HZ,
            q: NOISE_FILTER_Q,
            gain_db: 0.0,
        }
    }

    /// Clarity filter: peaking at 3.5 kHz with the given boost
    pub fn clarity(gain_db: f32) -> Self {
        Self {
            kind: BiquadKind::Peaking,
            frequency: CLARITY_CENTER_HZ,
            q: CLARITY_Q,
            gain_db,
        }
    }
}

/// Biquad filter coefficients, normalized by a0
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Unity pass-through
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate coefficients for a configuration at a sample rate
    pub fn calculate(config: &BiquadConfig, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        let nyquist = sample_rate / 2.0;
        let freq = config.frequency as f64;

        if config.kind == BiquadKind::Allpass || !(freq > 0.0) {
            return Self::IDENTITY;
        }
        if freq >= nyquist {
            // Cutoff at or above Nyquist passes everything; a peak there is a plain gain
            return match config.kind {
                BiquadKind::Peaking => {
                    let a = 10.0_f64.powf(config.gain_db as f64 / 40.0);
                    Self {
                        b0: a * a,
                        ..Self::IDENTITY
                    }
                }
                _ => Self::IDENTITY,
            };
        }

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();

        let (b0, b1, b2, a0, a1, a2) = match config.kind {
            BiquadKind::Lowpass => {
                let q_linear = 10.0_f64.powf(config.q as f64 / 20.0);
                let alpha = sin_w0 / (2.0 * q_linear);
                (
                    (1.0 - cos_w0) / 2.0,
                    1.0 - cos_w0,
                    (1.0 - cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            BiquadKind::Peaking => {
                let a = 10.0_f64.powf(config.gain_db as f64 / 40.0);
                let alpha = sin_w0 / (2.0 * (config.q as f64).max(1e-4));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            BiquadKind::Allpass => unreachable!("handled above"),
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Check if coefficients represent a bypass (unity gain, no filtering)
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process a single sample (Direct Form I)
    #[inline]
    pub fn process(&mut self, input: f32, coeffs: &BiquadCoeffs) -> f32 {
        let input = input as f64;
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output as f32
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
