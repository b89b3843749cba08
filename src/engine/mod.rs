//! Audio Engine Module
//!
//! - PCM buffer storage
//! - File intake (WAV/MP3 decode) and output
//! - Microphone capture sessions
//! - Playback/recording transport state

pub mod buffer;
pub mod capture;
pub mod io;
pub mod transport;

pub use buffer::{
    db_to_linear, linear_to_db, sine_tone, ChannelLayout, PcmBuffer, DEFAULT_SAMPLE_RATE,
    MAX_CHANNELS,
};
pub use capture::{CaptureDevice, Recorder};
pub use io::{decode_audio_bytes, import_audio, write_bytes, SourceFormat};
pub use transport::{ActivePlayback, PlaybackCategory, TransportManager, TransportState};
