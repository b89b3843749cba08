//! MP3 assembly
//!
//! 128 kbps constant bit rate through LAME. Input is fed one MP3 frame's
//! worth of samples per channel at a time, and every byte the encoder emits
//! is appended in call order, followed by the flush output. The flush pads
//! the last partial frame so the stream covers every input sample.

use mp3lame_encoder::{Bitrate, Builder, DualPcm, Encoder, FlushGap};

use super::pcm::channel_to_i16;
use crate::engine::PcmBuffer;
use crate::error::{EchoClipError, Result};

/// Samples per channel handed to the encoder per call
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// Fixed export bit rate
pub const MP3_BITRATE_KBPS: u32 = 128;

fn mp3_error(reason: impl Into<String>) -> EchoClipError {
    EchoClipError::Encode {
        format: "mp3",
        reason: reason.into(),
    }
}

fn build_encoder(channels: u8, sample_rate: u32) -> Result<Encoder> {
    let mut builder = Builder::new().ok_or_else(|| mp3_error("LAME failed to allocate"))?;
    builder
        .set_num_channels(channels)
        .map_err(|e| mp3_error(format!("channels {}: {:?}", channels, e)))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| mp3_error(format!("sample rate {}: {:?}", sample_rate, e)))?;
    builder
        .set_brate(Bitrate::Kbps128)
        .map_err(|e| mp3_error(format!("bitrate: {:?}", e)))?;
    builder
        .build()
        .map_err(|e| mp3_error(format!("init: {:?}", e)))
}

/// Encode a buffer as a 128 kbps MP3 stream in memory
///
/// Mono sources are fed to both encoder inputs.
pub fn encode_mp3(buffer: &PcmBuffer) -> Result<Vec<u8>> {
    let channels = buffer.num_channels().min(2) as u8;
    let mut encoder = build_encoder(channels, buffer.sample_rate())?;

    let left = channel_to_i16(buffer.channel(0));
    let right = if buffer.num_channels() > 1 {
        channel_to_i16(buffer.channel(1))
    } else {
        left.clone()
    };

    let mut out = Vec::new();
    for (l, r) in left
        .chunks(MP3_FRAME_SAMPLES)
        .zip(right.chunks(MP3_FRAME_SAMPLES))
    {
        out.reserve(mp3lame_encoder::max_required_buffer_size(l.len()));
        encoder
            .encode_to_vec(DualPcm { left: l, right: r }, &mut out)
            .map_err(|e| mp3_error(format!("encode: {:?}", e)))?;
    }

    out.reserve(mp3lame_encoder::max_required_buffer_size(MP3_FRAME_SAMPLES));
    encoder
        .flush_to_vec::<FlushGap>(&mut out)
        .map_err(|e| mp3_error(format!("flush: {:?}", e)))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{sine_tone, ChannelLayout};

    #[test]
    fn test_encodes_mono_tone() {
        let tone = sine_tone(440.0, 0.5, 0.5, 44100);
        let mp3 = encode_mp3(&tone).unwrap();
        assert!(!mp3.is_empty());
    }

    #[test]
    fn test_output_is_deterministic() {
        let buffer = PcmBuffer::silence(4000, ChannelLayout::Stereo, 48000);
        let first = encode_mp3(&buffer).unwrap();
        let second = encode_mp3(&buffer).unwrap();
        assert_eq!(first, second);
    }

    fn decoded_samples_per_channel(mp3: &[u8]) -> usize {
        let mut decoder = minimp3::Decoder::new(std::io::Cursor::new(mp3));
        let mut samples = 0;
        loop {
            match decoder.next_frame() {
                Ok(frame) => samples += frame.data.len() / frame.channels,
                Err(minimp3::Error::Eof) => break,
                Err(e) => panic!("decode error: {:?}", e),
            }
        }
        samples
    }

    #[test]
    fn test_flush_keeps_the_tail() {
        // Not a multiple of the frame size, so the last frame is partial
        let tone = sine_tone(440.0, 0.5, 0.5, 44100);
        let mp3 = encode_mp3(&tone).unwrap();
        assert!(decoded_samples_per_channel(&mp3) >= tone.len());

        let stereo = PcmBuffer::silence(5000, ChannelLayout::Stereo, 48000);
        let mp3 = encode_mp3(&stereo).unwrap();
        assert!(decoded_samples_per_channel(&mp3) >= stereo.len());
    }

    #[test]
    fn test_short_buffer_still_flushes() {
        let buffer = PcmBuffer::silence(10, ChannelLayout::Mono, 44100);
        let mp3 = encode_mp3(&buffer).unwrap();
        assert!(!mp3.is_empty());
    }
}
