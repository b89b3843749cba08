//! Effect Parameters
//!
//! The single shared description of user intent, read by the live graph and
//! by every new offline render. Values are clamped to their declared ranges
//! before they reach any node.

use serde::{Deserialize, Serialize};

use super::biquad::BiquadConfig;

// ============================================================================
// Ranges
// ============================================================================

/// Minimum echo delay in seconds
pub const MIN_DELAY_TIME: f32 = 0.01;

/// Maximum echo delay in seconds
pub const MAX_DELAY_TIME: f32 = 1.0;

/// Feedback upper bound (exclusive)
pub const FEEDBACK_LIMIT: f32 = 0.95;

/// Minimum voice boost (linear gain)
pub const MIN_VOICE_BOOST: f32 = 1.0;

/// Maximum voice boost (linear gain)
pub const MAX_VOICE_BOOST: f32 = 3.0;

/// Maximum clarity boost in dB
pub const MAX_CLARITY_DB: f32 = 12.0;

/// Largest feedback value that is still strictly below [`FEEDBACK_LIMIT`]
#[inline]
pub fn max_feedback() -> f32 {
    f32::from_bits(FEEDBACK_LIMIT.to_bits() - 1)
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

// ============================================================================
// Effect Parameters
// ============================================================================

/// User-facing effect settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    /// Echo delay in seconds (0.01 - 1.0)
    pub delay_time: f32,
    /// Echo feedback amount (0 - just below 0.95)
    pub feedback: f32,
    /// Lowpass noise filter on the echo path
    pub noise_reduction: bool,
    /// Voice boost as linear gain (1.0 - 3.0)
    pub voice_boost: f32,
    /// Presence boost at 3.5 kHz in dB (0 - 12)
    pub clarity_gain_db: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            delay_time: 0.3,
            feedback: 0.4,
            noise_reduction: false,
            voice_boost: 1.0,
            clarity_gain_db: 0.0,
        }
    }
}

impl EffectParams {
    /// Return a copy with every value forced into its declared range
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            delay_time: clamp_or(
                self.delay_time,
                MIN_DELAY_TIME,
                MAX_DELAY_TIME,
                defaults.delay_time,
            ),
            feedback: clamp_or(self.feedback, 0.0, max_feedback(), defaults.feedback),
            noise_reduction: self.noise_reduction,
            voice_boost: clamp_or(
                self.voice_boost,
                MIN_VOICE_BOOST,
                MAX_VOICE_BOOST,
                defaults.voice_boost,
            ),
            clarity_gain_db: clamp_or(
                self.clarity_gain_db,
                0.0,
                MAX_CLARITY_DB,
                defaults.clarity_gain_db,
            ),
        }
    }

    /// True when clamping would not change anything
    pub fn is_in_range(&self) -> bool {
        self.clamped() == *self
    }

    /// Noise filter configuration for the current mode
    pub fn noise_filter(&self) -> BiquadConfig {
        BiquadConfig::noise_filter(self.noise_reduction)
    }

    /// Clarity filter configuration for the current gain
    pub fn clarity_filter(&self) -> BiquadConfig {
        BiquadConfig::clarity(self.clarity_gain_db)
    }

    /// Whether the voice-only preview would sound different
    pub fn voice_differs(&self, other: &EffectParams) -> bool {
        self.noise_reduction != other.noise_reduction
            || self.voice_boost != other.voice_boost
            || self.clarity_gain_db != other.clarity_gain_db
    }

    /// Compute the node updates needed to move from `self` to `next`
    ///
    /// Both sides are clamped first, so the result only ever carries
    /// in-range values. Unchanged fields produce no update.
    pub fn diff(&self, next: &EffectParams) -> Vec<ParamUpdate> {
        let old = self.clamped();
        let new = next.clamped();
        let mut updates = Vec::new();

        if old.delay_time != new.delay_time {
            updates.push(ParamUpdate::DelayTime(new.delay_time));
        }
        if old.feedback != new.feedback {
            updates.push(ParamUpdate::Feedback(new.feedback));
        }
        if old.noise_reduction != new.noise_reduction {
            updates.push(ParamUpdate::NoiseFilter(new.noise_filter()));
        }
        if old.voice_boost != new.voice_boost {
            updates.push(ParamUpdate::VoiceBoost(new.voice_boost));
        }
        if old.clarity_gain_db != new.clarity_gain_db {
            updates.push(ParamUpdate::Clarity(new.clarity_filter()));
        }

        updates
    }
}

/// A single value change destined for one live node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamUpdate {
    DelayTime(f32),
    Feedback(f32),
    NoiseFilter(BiquadConfig),
    VoiceBoost(f32),
    Clarity(BiquadConfig),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::BiquadKind;
    use test_case::test_case;

    #[test_case(0.0, MIN_DELAY_TIME ; "below range")]
    #[test_case(5.0, MAX_DELAY_TIME ; "above range")]
    #[test_case(0.5, 0.5 ; "in range")]
    #[test_case(f32::NAN, 0.3 ; "nan falls back")]
    fn test_delay_clamp(input: f32, expected: f32) {
        let params = EffectParams {
            delay_time: input,
            ..Default::default()
        };
        assert_eq!(params.clamped().delay_time, expected);
    }

    #[test]
    fn test_feedback_never_reaches_limit() {
        for fb in [0.95, 0.96, 1.0, 10.0, f32::INFINITY] {
            let params = EffectParams {
                feedback: fb,
                ..Default::default()
            }
            .clamped();
            assert!(params.feedback < FEEDBACK_LIMIT, "feedback {}", fb);
        }
        assert!(max_feedback() > 0.9499);
    }

    #[test]
    fn test_voice_and_clarity_clamp() {
        let params = EffectParams {
            voice_boost: 0.2,
            clarity_gain_db: 40.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.voice_boost, MIN_VOICE_BOOST);
        assert_eq!(params.clarity_gain_db, MAX_CLARITY_DB);
        assert!(params.is_in_range());
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let old = EffectParams::default();
        let new = EffectParams {
            voice_boost: 2.0,
            noise_reduction: true,
            ..old
        };

        let updates = old.diff(&new);
        assert_eq!(updates.len(), 2);
        assert!(updates.contains(&ParamUpdate::VoiceBoost(2.0)));
        assert!(updates.iter().any(|u| matches!(
            u,
            ParamUpdate::NoiseFilter(cfg) if cfg.kind == BiquadKind::Lowpass
        )));
        assert!(old.diff(&old).is_empty());
    }

    #[test]
    fn test_diff_carries_clamped_values() {
        let old = EffectParams::default();
        let new = EffectParams {
            feedback: 0.95,
            ..old
        };
        assert_eq!(old.diff(&new), vec![ParamUpdate::Feedback(max_feedback())]);
    }

    #[test]
    fn test_voice_differs_ignores_echo() {
        let a = EffectParams::default();
        let b = EffectParams {
            delay_time: 0.8,
            feedback: 0.1,
            ..a
        };
        assert!(!a.voice_differs(&b));
        let c = EffectParams {
            clarity_gain_db: 3.0,
            ..a
        };
        assert!(a.voice_differs(&c));
    }

    #[test]
    fn test_json_roundtrip_with_defaults() {
        let params: EffectParams = serde_json::from_str(r#"{"voice_boost": 2.5}"#).unwrap();
        assert_eq!(params.voice_boost, 2.5);
        assert_eq!(params.delay_time, 0.3);
    }
}
