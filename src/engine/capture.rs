//! Microphone capture
//!
//! The platform recorder is abstracted as a [`CaptureDevice`] that emits
//! encoded chunks while running. [`Recorder`] collects them and hands back a
//! single byte buffer on stop, which goes through the normal intake path.

use chrono::{DateTime, Utc};

use crate::error::{EchoClipError, Result};

/// A source of encoded audio chunks
pub trait CaptureDevice: Send {
    /// Begin capturing; fails with `PermissionDenied` or `Capture`
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and return any chunk still buffered in the device
    fn stop(&mut self) -> Result<Option<Vec<u8>>>;
}

enum RecorderState {
    Idle,
    Recording {
        device: Box<dyn CaptureDevice>,
        chunks: Vec<Vec<u8>>,
        started_at: DateTime<Utc>,
    },
}

/// Recording session over a capture device
pub struct Recorder {
    state: RecorderState,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
        }
    }

    /// Start a recording session
    ///
    /// On failure the recorder stays idle and the device is dropped.
    pub fn start(&mut self, mut device: Box<dyn CaptureDevice>) -> Result<()> {
        if self.is_recording() {
            return Err(EchoClipError::Capture {
                reason: "a recording is already running".to_string(),
            });
        }

        device.start()?;
        let started_at = Utc::now();
        log::info!("Recording started at {}", started_at.to_rfc3339());
        self.state = RecorderState::Recording {
            device,
            chunks: Vec::new(),
            started_at,
        };
        Ok(())
    }

    /// Append a chunk emitted by the device
    pub fn push_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        match &mut self.state {
            RecorderState::Recording { chunks, .. } => {
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
                Ok(())
            }
            RecorderState::Idle => Err(EchoClipError::Capture {
                reason: "not recording".to_string(),
            }),
        }
    }

    /// Stop the session, flush the device and assemble every chunk in order
    ///
    /// The recorder is idle afterwards even if the device fails to stop.
    pub fn stop(&mut self) -> Result<Vec<u8>> {
        let state = std::mem::replace(&mut self.state, RecorderState::Idle);
        let RecorderState::Recording {
            mut device,
            mut chunks,
            started_at,
        } = state
        else {
            return Err(EchoClipError::Capture {
                reason: "not recording".to_string(),
            });
        };

        if let Some(tail) = device.stop()? {
            if !tail.is_empty() {
                chunks.push(tail);
            }
        }

        let assembled = chunks.concat();
        let elapsed = Utc::now().signed_duration_since(started_at);
        log::info!(
            "Recording stopped after {} ms: {} chunks, {} bytes",
            elapsed.num_milliseconds(),
            chunks.len(),
            assembled.len()
        );
        Ok(assembled)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
    }

    /// When the running session started
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            RecorderState::Recording { started_at, .. } => Some(*started_at),
            RecorderState::Idle => None,
        }
    }

    /// Bytes collected so far in the running session
    pub fn buffered_bytes(&self) -> usize {
        match &self.state {
            RecorderState::Recording { chunks, .. } => chunks.iter().map(Vec::len).sum(),
            RecorderState::Idle => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDevice {
        deny: bool,
        tail: Option<Vec<u8>>,
    }

    impl CaptureDevice for FakeDevice {
        fn start(&mut self) -> Result<()> {
            if self.deny {
                Err(EchoClipError::PermissionDenied)
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(self.tail.take())
        }
    }

    fn device(tail: &[u8]) -> Box<dyn CaptureDevice> {
        Box::new(FakeDevice {
            deny: false,
            tail: Some(tail.to_vec()),
        })
    }

    #[test]
    fn test_chunks_assembled_in_order_with_tail() {
        let mut recorder = Recorder::new();
        recorder.start(device(b"EF")).unwrap();
        assert!(recorder.is_recording());
        assert!(recorder.started_at().is_some());

        recorder.push_chunk(b"AB".to_vec()).unwrap();
        recorder.push_chunk(Vec::new()).unwrap();
        recorder.push_chunk(b"CD".to_vec()).unwrap();
        assert_eq!(recorder.buffered_bytes(), 4);

        assert_eq!(recorder.stop().unwrap(), b"ABCDEF".to_vec());
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_permission_denied_stays_idle() {
        let mut recorder = Recorder::new();
        let err = recorder
            .start(Box::new(FakeDevice {
                deny: true,
                tail: None,
            }))
            .unwrap_err();
        assert!(matches!(err, EchoClipError::PermissionDenied));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_push_while_idle_fails() {
        let mut recorder = Recorder::new();
        assert!(recorder.push_chunk(vec![1]).is_err());
        assert!(recorder.stop().is_err());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut recorder = Recorder::new();
        recorder.start(device(b"")).unwrap();
        assert!(recorder.start(device(b"")).is_err());
        assert!(recorder.is_recording());
    }
}
