//! Audio intake and file output
//!
//! Decodes WAV (any bit depth hound reads) and MP3 bytes into a
//! [`PcmBuffer`] at the source sample rate. Anything else is a decode error,
//! which the application surfaces as "format unsupported".

use std::fs;
use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use minimp3::{Decoder as Mp3Decoder, Error as Mp3Error, Frame};

use crate::engine::buffer::{PcmBuffer, MAX_CHANNELS};
use crate::error::{EchoClipError, Result};

/// Container detected from the leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Wav,
    Mp3,
}

impl SourceFormat {
    /// Sniff the container; anything that is not RIFF/WAVE is tried as MP3
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            SourceFormat::Wav
        } else {
            SourceFormat::Mp3
        }
    }
}

/// Decode an in-memory audio file
///
/// # Arguments
/// * `bytes` - Complete WAV or MP3 file contents
///
/// # Errors
/// * `Decode` - If the bytes are not a readable WAV or MP3 stream
/// * `UnsupportedFormat` - If the audio has more than 2 channels
pub fn decode_audio_bytes(bytes: &[u8]) -> Result<PcmBuffer> {
    if bytes.is_empty() {
        return Err(EchoClipError::Decode {
            reason: "input is empty".to_string(),
            source: None,
        });
    }

    let format = SourceFormat::detect(bytes);
    let buffer = match format {
        SourceFormat::Wav => decode_wav(bytes)?,
        SourceFormat::Mp3 => decode_mp3(bytes)?,
    };

    if buffer.is_empty() {
        return Err(EchoClipError::Decode {
            reason: format!("{:?} stream contains no samples", format),
            source: None,
        });
    }

    log::debug!(
        "Decoded {:?}: {} ch, {} Hz, {} frames",
        format,
        buffer.num_channels(),
        buffer.sample_rate(),
        buffer.len()
    );
    Ok(buffer)
}

/// Read and decode an audio file from disk
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * anything [`decode_audio_bytes`] returns
pub fn import_audio(path: &Path) -> Result<PcmBuffer> {
    if !path.exists() {
        return Err(EchoClipError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = fs::read(path)?;
    decode_audio_bytes(&bytes)
}

/// Write an encoded payload to disk, creating parent directories
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn check_channels(channels: usize) -> Result<()> {
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(EchoClipError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }
    Ok(())
}

fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer> {
    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| EchoClipError::decode("failed to read WAV header", e))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    check_channels(channels)?;

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    PcmBuffer::from_interleaved(&samples, channels, spec.sample_rate)
}

type WavSamples = std::result::Result<Vec<f32>, hound::Error>;

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let collected: WavSamples = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().collect(),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect(),
        (SampleFormat::Int, bits) => {
            return Err(EchoClipError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits),
            })
        }
    };

    collected.map_err(|e| EchoClipError::decode("failed to read WAV samples", e))
}

fn decode_mp3(bytes: &[u8]) -> Result<PcmBuffer> {
    let mut decoder = Mp3Decoder::new(Cursor::new(bytes));
    let mut interleaved: Vec<f32> = Vec::new();
    let mut layout: Option<(usize, u32)> = None;

    loop {
        match decoder.next_frame() {
            Ok(Frame {
                data,
                sample_rate,
                channels,
                ..
            }) => {
                let sample_rate = sample_rate.max(0) as u32;
                match layout {
                    None => {
                        check_channels(channels)?;
                        layout = Some((channels, sample_rate));
                    }
                    Some(expected) if expected != (channels, sample_rate) => {
                        return Err(EchoClipError::Decode {
                            reason: format!(
                                "MP3 stream changes layout mid-stream ({:?} -> {:?})",
                                expected,
                                (channels, sample_rate)
                            ),
                            source: None,
                        });
                    }
                    Some(_) => {}
                }
                interleaved.extend(data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(Mp3Error::Eof) | Err(Mp3Error::InsufficientData) => break,
            Err(Mp3Error::SkippedData) => continue,
            Err(Mp3Error::Io(e)) => {
                return Err(EchoClipError::decode("failed to read MP3 stream", e));
            }
        }
    }

    let (channels, sample_rate) = layout.ok_or_else(|| EchoClipError::Decode {
        reason: "not a WAV or MP3 stream".to_string(),
        source: None,
    })?;
    PcmBuffer::from_interleaved(&interleaved, channels, sample_rate)
}

// ============================================================================
// Tests
// ============================================================================
