//! Sample Codec
//!
//! Pure functions turning a PCM buffer into exportable WAV and MP3 payloads.

mod mp3;
mod pcm;
mod wav;

pub use mp3::{encode_mp3, MP3_BITRATE_KBPS, MP3_FRAME_SAMPLES};
pub use pcm::{channel_to_i16, float_to_i16};
pub use wav::{encode_wav, encoded_len as wav_encoded_len, WAV_HEADER_LEN};

use crate::engine::PcmBuffer;
use crate::error::Result;

/// Both export encodings of one rendered buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub wav: Vec<u8>,
    pub mp3: Vec<u8>,
}

/// Encode a buffer into every export format
///
/// All-or-nothing: if either encoding fails, nothing is returned.
pub fn encode_all(buffer: &PcmBuffer) -> Result<EncodedAudio> {
    let wav = encode_wav(buffer)?;
    let mp3 = encode_mp3(buffer)?;
    log::debug!(
        "Encoded {} frames: wav {} bytes, mp3 {} bytes",
        buffer.len(),
        wav.len(),
        mp3.len()
    );
    Ok(EncodedAudio { wav, mp3 })
}
