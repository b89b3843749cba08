//! Offline rendering
//!
//! Every render gets its own disposable [`GraphProcessor`], sized to the
//! input's channel count and sample rate and run for exactly the input's
//! length. Echo tails past the end of the input are cut off.

use crate::dsp::EffectParams;
use crate::engine::PcmBuffer;
use crate::error::{EchoClipError, Result};
use crate::graph::{
    build_plan, realize, GraphProcessor, GraphVariant, PlaybackBackend, PlaybackTarget, Stage,
};

fn render_error(reason: impl Into<String>) -> EchoClipError {
    EchoClipError::Render {
        reason: reason.into(),
    }
}

/// Render `input` through a fresh graph built from `params`
///
/// # Arguments
/// * `input` - Clip to process; left untouched
/// * `params` - Effect settings, clamped before use
/// * `variant` - Full echo chain or voice-only preview
///
/// # Returns
/// A buffer with the same channel count, sample rate and length as `input`
///
/// # Errors
/// * `Render` - If the input is empty or the graph produces non-finite samples
pub fn render_offline(
    input: &PcmBuffer,
    params: &EffectParams,
    variant: GraphVariant,
) -> Result<PcmBuffer> {
    render_owned(input.clone(), params, variant)
}

/// Voice-only render used for before/after comparison
pub fn render_preview(input: &PcmBuffer, params: &EffectParams) -> Result<PcmBuffer> {
    render_offline(input, params, GraphVariant::VoicePreview)
}

/// [`render_offline`] on the blocking pool
///
/// Takes ownership so concurrent renders share nothing.
pub async fn render_offline_async(
    input: PcmBuffer,
    params: EffectParams,
    variant: GraphVariant,
) -> Result<PcmBuffer> {
    tokio::task::spawn_blocking(move || render_owned(input, &params, variant))
        .await
        .map_err(|e| render_error(format!("render task failed: {}", e)))?
}

fn render_owned(input: PcmBuffer, params: &EffectParams, variant: GraphVariant) -> Result<PcmBuffer> {
    if input.is_empty() {
        return Err(render_error("input buffer is empty"));
    }

    let frames = input.len();
    let plan = build_plan(params, variant);
    let mut processor = GraphProcessor::new(input.num_channels(), input.sample_rate());
    let stages = realize(&plan, &mut processor)?;
    processor.start_source(input, PlaybackTarget::Node(stages.require(Stage::Source)?))?;

    let output = processor.process(frames)?;
    if !output.is_finite() {
        return Err(render_error("graph produced non-finite samples"));
    }

    log::debug!(
        "Offline {:?} render: {} ch, {} frames at {} Hz",
        variant,
        output.num_channels(),
        output.len(),
        output.sample_rate()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{sine_tone, ChannelLayout};
    use approx::assert_relative_eq;

    fn impulse(len: usize, sample_rate: u32) -> PcmBuffer {
        let mut samples = vec![0.0; len];
        samples[0] = 0.5;
        PcmBuffer::from_channels(vec![samples], sample_rate).unwrap()
    }

    #[test]
    fn test_output_matches_input_shape() {
        let stereo = PcmBuffer::from_channels(vec![vec![0.1; 500], vec![-0.1; 500]], 8000).unwrap();
        let out = render_offline(&stereo, &EffectParams::default(), GraphVariant::Full).unwrap();
        assert_eq!(out.num_channels(), 2);
        assert_eq!(out.len(), 500);
        assert_eq!(out.sample_rate(), 8000);
    }

    #[test]
    fn test_echo_is_additive_and_truncated() {
        // 1 kHz, 10 ms delay: echoes every 10 frames, input lasts 25 frames
        let params = EffectParams {
            delay_time: 0.01,
            feedback: 0.5,
            ..Default::default()
        };
        let out = render_offline(&impulse(25, 1000), &params, GraphVariant::Full).unwrap();
        let s = out.channel(0);
        assert_eq!(s.len(), 25);
        assert_relative_eq!(s[0], 0.5);
        assert_relative_eq!(s[10], 0.5);
        assert_relative_eq!(s[20], 0.25);
    }

    #[test]
    fn test_preview_ignores_echo_params() {
        let tone = sine_tone(300.0, 0.3, 0.05, 8000);
        let a = render_preview(&tone, &EffectParams::default()).unwrap();
        let b = render_preview(
            &tone,
            &EffectParams {
                delay_time: 0.9,
                feedback: 0.9,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_neutral_preview_is_identity() {
        let tone = sine_tone(300.0, 0.3, 0.05, 8000);
        let out = render_preview(&tone, &EffectParams::default()).unwrap();
        for (a, b) in tone.channel(0).iter().zip(out.channel(0)) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_voice_boost_scales_preview() {
        let tone = sine_tone(300.0, 0.2, 0.05, 8000);
        let params = EffectParams {
            voice_boost: 2.0,
            ..Default::default()
        };
        let out = render_preview(&tone, &params).unwrap();
        for (a, b) in tone.channel(0).iter().zip(out.channel(0)) {
            assert_relative_eq!(a * 2.0, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_empty_input_is_render_error() {
        let empty = PcmBuffer::silence(0, ChannelLayout::Mono, 44100);
        let err = render_offline(&empty, &EffectParams::default(), GraphVariant::Full).unwrap_err();
        assert!(err.is_render_failure());
    }

    #[tokio::test]
    async fn test_concurrent_renders_are_isolated() {
        let tone = sine_tone(440.0, 0.4, 0.2, 16000);
        let full_params = EffectParams {
            feedback: 0.8,
            ..Default::default()
        };
        let voice_params = EffectParams {
            clarity_gain_db: 6.0,
            ..Default::default()
        };

        let solo_full = render_offline(&tone, &full_params, GraphVariant::Full).unwrap();
        let solo_preview = render_preview(&tone, &voice_params).unwrap();

        let (full, preview) = tokio::join!(
            render_offline_async(tone.clone(), full_params, GraphVariant::Full),
            render_offline_async(tone.clone(), voice_params, GraphVariant::VoicePreview),
        );
        assert_eq!(full.unwrap(), solo_full);
        assert_eq!(preview.unwrap(), solo_preview);
    }
}
