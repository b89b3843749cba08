//! Integration Tests
//!
//! End-to-end tests for the EchoClip pipeline: intake, graph, rendering,
//! encoding and history.

use std::io::Cursor;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use echoclip::codec::{encode_all, encode_wav, float_to_i16, WAV_HEADER_LEN};
use echoclip::dsp::{max_feedback, EffectParams};
use echoclip::engine::{decode_audio_bytes, sine_tone, ChannelLayout, PcmBuffer, PlaybackCategory};
use echoclip::graph::{build_plan, GraphVariant, NodeSpec, Stage};
use echoclip::render::{render_offline, render_offline_async, render_preview, LiveSession};
use echoclip::state::{Studio, StudioConfig};

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn short_clip() -> Vec<u8> {
    encode_wav(&sine_tone(330.0, 0.4, 0.05, 8000)).unwrap()
}

// === Codec ===

#[test]
fn test_wav_header_exactness() {
    let buffer = PcmBuffer::silence(1000, ChannelLayout::Stereo, 44100);
    let wav = encode_wav(&buffer).unwrap();

    assert_eq!(wav.len(), 4044);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(u32_at(&wav, 4), 4036);
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&wav[12..16], b"fmt ");
    assert_eq!(u32_at(&wav, 24), 44100);
    assert_eq!(u32_at(&wav, 28), 176400);
    assert_eq!(&wav[36..40], b"data");
    assert_eq!(u32_at(&wav, 40), 4000);
    assert_eq!(WAV_HEADER_LEN, 44);
}

#[test]
fn test_full_scale_and_clamping() {
    let buffer = PcmBuffer::from_channels(vec![vec![0.0, 1.0, -1.0, 1.5, -1.5]], 8000).unwrap();
    let wav = encode_wav(&buffer).unwrap();
    let samples: Vec<i16> = wav[44..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(samples, vec![0, 32767, -32768, 32767, -32768]);
    assert_eq!(float_to_i16(-0.5), -16384);
}

#[test]
fn test_mp3_export_is_128kbps() {
    let tone = sine_tone(440.0, 0.5, 0.5, 44100);
    let encoded = encode_all(&tone).unwrap();

    let mut decoder = minimp3::Decoder::new(Cursor::new(&encoded.mp3));
    let mut frames = 0;
    let mut samples = 0;
    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                assert_eq!(frame.sample_rate, 44100);
                assert_eq!(frame.bitrate, 128);
                frames += 1;
                samples += frame.data.len() / frame.channels;
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => panic!("decode error: {:?}", e),
        }
    }
    assert!(frames > 0);
    assert!(samples >= tone.len());
}

// === Graph ===

#[test]
fn test_feedback_never_reaches_loop_limit() {
    let plan = build_plan(
        &EffectParams {
            feedback: 0.95,
            delay_time: 0.001,
            ..Default::default()
        },
        GraphVariant::Full,
    );

    match plan.node(Stage::FeedbackGain).unwrap().spec {
        NodeSpec::Gain { gain } => {
            assert!(gain < 0.95);
            assert_eq!(gain, max_feedback());
        }
        other => panic!("unexpected spec {:?}", other),
    }
    match plan.node(Stage::Delay).unwrap().spec {
        NodeSpec::Delay { delay_time, .. } => assert_eq!(delay_time, 0.01),
        other => panic!("unexpected spec {:?}", other),
    }
}

#[test]
fn test_noise_filter_toggle_is_idempotent() {
    let clip = sine_tone(2000.0, 0.5, 0.05, 16000);

    let mut toggled = LiveSession::with_processor(1, 16000, EffectParams::default());
    toggled.ensure_ready().unwrap();
    for enabled in [true, false] {
        toggled
            .apply_params(&EffectParams {
                noise_reduction: enabled,
                ..Default::default()
            })
            .unwrap();
    }

    let mut fresh = LiveSession::with_processor(1, 16000, EffectParams::default());

    toggled.play(PlaybackCategory::Processed, clip.clone()).unwrap();
    fresh.play(PlaybackCategory::Processed, clip.clone()).unwrap();
    assert_eq!(
        toggled.pull(clip.len()).unwrap(),
        fresh.pull(clip.len()).unwrap()
    );
}

#[test]
fn test_disabled_noise_filter_passes_through() {
    let clip = sine_tone(12000.0, 0.5, 0.05, 44100);
    let out = render_preview(&clip, &EffectParams::default()).unwrap();
    for (a, b) in clip.channel(0).iter().zip(out.channel(0)) {
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    let filtered = render_preview(
        &clip,
        &EffectParams {
            noise_reduction: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(filtered.rms_db() < clip.rms_db() - 3.0);
}

// === Rendering ===

#[test]
fn test_offline_render_keeps_length() {
    let clip = decode_audio_bytes(&short_clip()).unwrap();
    let params = EffectParams {
        delay_time: 1.0,
        feedback: 0.9,
        ..Default::default()
    };
    let out = render_offline(&clip, &params, GraphVariant::Full).unwrap();
    assert_eq!(out.len(), clip.len());
    assert_eq!(out.sample_rate(), clip.sample_rate());
}

#[tokio::test]
async fn test_render_isolation() {
    let clip = sine_tone(440.0, 0.4, 0.25, 22050);
    let echo = EffectParams {
        feedback: 0.7,
        delay_time: 0.05,
        ..Default::default()
    };
    let voice = EffectParams {
        voice_boost: 2.0,
        clarity_gain_db: 9.0,
        noise_reduction: true,
        ..Default::default()
    };

    let expected_export = render_offline(&clip, &echo, GraphVariant::Full).unwrap();
    let expected_preview = render_preview(&clip, &voice).unwrap();

    let (export, preview) = tokio::join!(
        render_offline_async(clip.clone(), echo, GraphVariant::Full),
        render_offline_async(clip.clone(), voice, GraphVariant::VoicePreview),
    );
    assert_eq!(export.unwrap(), expected_export);
    assert_eq!(preview.unwrap(), expected_preview);
}

// === Studio ===

#[test]
fn test_history_evicts_oldest_on_eleventh_export() {
    let mut studio = Studio::default();
    studio.load_bytes("clip.wav", &short_clip()).unwrap();

    let ids: Vec<u64> = (0..11).map(|_| studio.export().unwrap()).collect();
    let history = studio.history();

    assert_eq!(history.len(), 10);
    assert!(history.get(ids[0]).is_none());
    let order: Vec<u64> = history.iter().map(|r| r.id).collect();
    let expected: Vec<u64> = ids[1..].iter().rev().copied().collect();
    assert_eq!(order, expected);
}

#[test]
fn test_playback_is_exclusive() {
    let mut studio = Studio::default();
    studio.load_bytes("clip.wav", &short_clip()).unwrap();

    let original = studio.play(PlaybackCategory::Original).unwrap();
    let processed = studio.play(PlaybackCategory::Processed).unwrap();
    assert_ne!(original, processed);

    let active = studio.playback().unwrap();
    assert_eq!(active.category, PlaybackCategory::Processed);
    assert_eq!(studio.live().backend().active_sources(), 1);

    studio.play(PlaybackCategory::Preview).unwrap();
    assert_eq!(studio.live().backend().active_sources(), 1);

    studio.stop_playback();
    assert!(studio.playback().is_none());
    assert_eq!(studio.live().backend().active_sources(), 0);
}

#[test]
fn test_failed_export_leaves_history_untouched() {
    let mut studio = Studio::new(StudioConfig {
        history_capacity: 2,
        ..Default::default()
    });
    studio.load_bytes("clip.wav", &short_clip()).unwrap();
    let id = studio.export().unwrap();

    // A failed load clears the clip; the next export fails
    assert!(studio.load_bytes("bad.bin", &[0u8; 64]).is_err());
    assert!(studio.export().is_err());

    assert_eq!(studio.history().len(), 1);
    assert_eq!(studio.history().newest().unwrap().id, id);
    assert_eq!(studio.status().unwrap().code, Some("NOT_LOADED"));
}

#[tokio::test]
async fn test_async_export_matches_sync_export() {
    let mut studio = Studio::default();
    studio.load_bytes("clip.wav", &short_clip()).unwrap();

    let sync_id = studio.export().unwrap();
    let async_id = studio.export_with_preview_async().await.unwrap();

    let history = studio.history();
    let a = history.get(sync_id).unwrap();
    let b = history.get(async_id).unwrap();
    assert_eq!(a.wav, b.wav);
    assert_eq!(a.mp3_sha256, b.mp3_sha256);
    assert!(studio.preview().is_some());
}
