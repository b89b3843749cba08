//! DSP building blocks
//!
//! Effect parameters plus the sample-level primitives the graph processor
//! runs: biquad sections and delay lines.

mod biquad;
mod delay;
mod params;

pub use biquad::{
    BiquadCoeffs, BiquadConfig, BiquadKind, BiquadState, CLARITY_CENTER_HZ, CLARITY_Q,
    NOISE_FILTER_CUTOFF_HZ, NOISE_FILTER_Q,
};
pub use delay::{DelayLine, MAX_DELAY_SECS};
pub use params::{
    max_feedback, EffectParams, ParamUpdate, FEEDBACK_LIMIT, MAX_CLARITY_DB, MAX_DELAY_TIME,
    MAX_VOICE_BOOST, MIN_DELAY_TIME, MIN_VOICE_BOOST,
};
