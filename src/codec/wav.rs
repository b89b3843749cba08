//! WAV assembly
//!
//! Produces a canonical 44-byte-header RIFF/WAVE file with 16-bit PCM
//! samples, interleaved frame by frame, little-endian.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::pcm::float_to_i16;
use crate::engine::PcmBuffer;
use crate::error::{EchoClipError, Result};

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per encoded sample
const BYTES_PER_SAMPLE: usize = 2;

/// Expected size of the encoded file for a buffer
pub fn encoded_len(buffer: &PcmBuffer) -> usize {
    WAV_HEADER_LEN + buffer.len() * buffer.num_channels() * BYTES_PER_SAMPLE
}

fn wav_error(e: hound::Error) -> EchoClipError {
    EchoClipError::Encode {
        format: "wav",
        reason: e.to_string(),
    }
}

/// Encode a buffer as a 16-bit PCM WAV file in memory
pub fn encode_wav(buffer: &PcmBuffer) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(encoded_len(buffer)));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for frame in 0..buffer.len() {
            for channel in buffer.channels() {
                writer
                    .write_sample(float_to_i16(channel[frame]))
                    .map_err(wav_error)?;
            }
        }
        writer.finalize().map_err(wav_error)?;
    }

    Ok(cursor.into_inner())
}
