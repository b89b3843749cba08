//! Studio: the application root
//!
//! Owns the effect settings, the loaded clip, the live session, the preview
//! render, the history and the recorder. Each public operation is an error
//! boundary: a failure is written to [`Studio::status`] and leaves the
//! previous clip, preview and history in place (intake failures excepted,
//! which reset to "no clip loaded").

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::codec::{encode_all, EncodedAudio};
use crate::dsp::EffectParams;
use crate::engine::{
    decode_audio_bytes, import_audio, write_bytes, ActivePlayback, CaptureDevice, PcmBuffer,
    PlaybackCategory, Recorder,
};
use crate::error::{EchoClipError, Result};
use crate::graph::{GraphProcessor, GraphVariant, SourceId};
use crate::render::{
    render_offline, render_offline_async, render_preview, LiveSession, SessionState,
};
use crate::state::config::StudioConfig;
use crate::state::history::{History, RenderResult};

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// Last user-visible outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    /// Stable error code for failures
    pub code: Option<&'static str>,
    pub at: DateTime<Utc>,
}

impl Status {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
            code: None,
            at: Utc::now(),
        }
    }

    fn error(context: &str, err: &EchoClipError) -> Self {
        Self {
            level: StatusLevel::Error,
            message: format!("{}: {}", context, err.friendly_message()),
            code: Some(err.error_code()),
            at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The clip currently being edited
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedClip {
    pub name: String,
    pub buffer: PcmBuffer,
}

/// Application root
pub struct Studio {
    config: StudioConfig,
    params: EffectParams,
    clip: Option<LoadedClip>,
    preview: Option<PcmBuffer>,
    live: LiveSession<GraphProcessor>,
    history: History,
    recorder: Recorder,
    status: Option<Status>,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(StudioConfig::default())
    }
}

impl Studio {
    /// Create a studio; the live graph is built on first playback
    pub fn new(config: StudioConfig) -> Self {
        let params = config.default_params.clamped();
        let live = LiveSession::with_processor(
            config.monitor_channels,
            config.monitor_sample_rate,
            params,
        );
        Self {
            history: History::new(config.history_capacity),
            params,
            clip: None,
            preview: None,
            live,
            recorder: Recorder::new(),
            status: None,
            config,
        }
    }

    // ========================================================================
    // Error boundary
    // ========================================================================

    fn report<T>(&mut self, context: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::warn!("{} failed: {}", context, e);
            self.status = Some(Status::error(context, e));
        }
        result
    }

    fn inform(&mut self, message: String) {
        log::info!("{}", message);
        self.status = Some(Status::info(message));
    }

    fn require_clip(&self) -> Result<&LoadedClip> {
        self.clip.as_ref().ok_or(EchoClipError::NotLoaded)
    }

    // ========================================================================
    // Intake
    // ========================================================================

    /// Load a clip from encoded bytes
    ///
    /// On a decode failure the previous clip is dropped and the status
    /// reports the format as unsupported.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let decoded = decode_audio_bytes(bytes);
        self.install_clip(name, decoded)
    }

    /// Load a clip from a WAV or MP3 file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let decoded = import_audio(path);
        self.install_clip(&name, decoded)
    }

    fn install_clip(&mut self, name: &str, decoded: Result<PcmBuffer>) -> Result<()> {
        self.live.stop_all();
        let buffer = match decoded {
            Ok(buffer) => buffer,
            Err(e) => {
                self.clip = None;
                self.preview = None;
                return self.report("Load", Err(e));
            }
        };

        let duration = buffer.duration_secs();
        self.clip = Some(LoadedClip {
            name: name.to_string(),
            buffer,
        });
        self.preview = None;
        self.inform(format!("Loaded {} ({:.2} s)", name, duration));

        if self.config.preview_enabled {
            // A failed preview leaves the clip loaded; status carries the error
            self.refresh_preview().ok();
        }
        Ok(())
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Change the effect settings
    ///
    /// Values are clamped, changed values are pushed onto the live graph,
    /// and the preview is re-rendered when a voice setting changed.
    pub fn set_params(&mut self, params: EffectParams) -> Result<()> {
        let next = params.clamped();
        let voice_changed = self.params.voice_differs(&next);

        let pushed = self.live.apply_params(&next);
        self.report("Update effects", pushed)?;
        self.params = next;

        if voice_changed && self.config.preview_enabled && self.clip.is_some() {
            self.refresh_preview()?;
        }
        Ok(())
    }

    /// Re-render the voice-only preview of the loaded clip
    pub fn refresh_preview(&mut self) -> Result<()> {
        let rendered = self
            .require_clip()
            .and_then(|clip| render_preview(&clip.buffer, &self.params));
        let preview = self.report("Preview", rendered)?;
        self.preview = Some(preview);
        Ok(())
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Render the loaded clip, encode it and store the result in history
    ///
    /// # Returns
    /// The id of the new history entry
    pub fn export(&mut self) -> Result<u64> {
        let attempt = self.require_clip().and_then(|clip| {
            let processed = render_offline(&clip.buffer, &self.params, GraphVariant::Full)?;
            let encoded = encode_all(&processed)?;
            Ok((clip.name.clone(), processed, encoded))
        });
        let (name, processed, encoded) = self.report("Export", attempt)?;
        Ok(self.store(name, processed, encoded))
    }

    /// [`export`](Self::export) with the render on the blocking pool
    pub async fn export_async(&mut self) -> Result<u64> {
        let clip = self.report("Export", self.require_clip().cloned())?;
        let rendered = render_offline_async(clip.buffer, self.params, GraphVariant::Full)
            .await
            .and_then(|processed| {
                let encoded = encode_all(&processed)?;
                Ok((processed, encoded))
            });
        let (processed, encoded) = self.report("Export", rendered)?;
        Ok(self.store(clip.name, processed, encoded))
    }

    /// Export and re-render the preview as two concurrent renders
    pub async fn export_with_preview_async(&mut self) -> Result<u64> {
        let clip = self.report("Export", self.require_clip().cloned())?;
        let (full, preview) = tokio::join!(
            render_offline_async(clip.buffer.clone(), self.params, GraphVariant::Full),
            render_offline_async(clip.buffer, self.params, GraphVariant::VoicePreview),
        );

        if let Ok(preview) = self.report("Preview", preview) {
            self.preview = Some(preview);
        }
        let encoded = full.and_then(|processed| {
            let encoded = encode_all(&processed)?;
            Ok((processed, encoded))
        });
        let (processed, encoded) = self.report("Export", encoded)?;
        Ok(self.store(clip.name, processed, encoded))
    }

    fn store(&mut self, name: String, processed: PcmBuffer, encoded: EncodedAudio) -> u64 {
        let id = self.history.next_id();
        let result = RenderResult::new(id, name, self.params, processed, encoded);
        self.inform(format!(
            "Exported {} (WAV {} bytes, MP3 {} bytes)",
            result.source_name,
            result.wav.len(),
            result.mp3.len()
        ));
        self.history.insert(result);
        id
    }

    /// Write a history entry's WAV and MP3 into `dir`
    ///
    /// # Returns
    /// Paths of the WAV and MP3 files
    pub fn save_history_item(&mut self, id: u64, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let attempt = self
            .history
            .get(id)
            .ok_or(EchoClipError::HistoryItemNotFound { id })
            .and_then(|item| {
                let stem = item.file_stem();
                let wav_path = dir.join(format!("{}.wav", stem));
                let mp3_path = dir.join(format!("{}.mp3", stem));
                write_bytes(&wav_path, &item.wav)?;
                write_bytes(&mp3_path, &item.mp3)?;
                Ok((wav_path, mp3_path))
            });
        let paths = self.report("Save", attempt)?;
        self.inform(format!("Saved {}", paths.0.display()));
        Ok(paths)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Audition the loaded clip, its processed version, the preview or the
    /// newest history entry, stopping anything already playing
    pub fn play(&mut self, category: PlaybackCategory) -> Result<SourceId> {
        let buffer = match category {
            PlaybackCategory::Original | PlaybackCategory::Processed => {
                self.require_clip().map(|c| c.buffer.clone())
            }
            PlaybackCategory::Preview => self.preview.clone().ok_or(EchoClipError::NotLoaded),
            PlaybackCategory::HistoryItem => self
                .history
                .newest()
                .map(|r| r.processed.clone())
                .ok_or(EchoClipError::NotLoaded),
        };
        let buffer = self.report("Play", buffer)?;
        let started = self.live.play(category, buffer);
        self.report("Play", started)
    }

    /// Play a specific history entry
    pub fn play_history(&mut self, id: u64) -> Result<SourceId> {
        let buffer = self
            .history
            .get(id)
            .map(|r| r.processed.clone())
            .ok_or(EchoClipError::HistoryItemNotFound { id });
        let buffer = self.report("Play", buffer)?;
        let started = self.live.play(PlaybackCategory::HistoryItem, buffer);
        self.report("Play", started)
    }

    /// Stop whatever is playing
    pub fn stop_playback(&mut self) {
        self.live.stop_all();
    }

    /// Pull monitor output for the audio device
    pub fn pull_monitor(&mut self, frames: usize) -> Result<PcmBuffer> {
        let out = self.live.pull(frames);
        self.report("Playback", out)
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Start recording from a capture device
    ///
    /// On failure the studio stays in the "not recording" state.
    pub fn start_recording(&mut self, device: Box<dyn CaptureDevice>) -> Result<()> {
        let started = self.recorder.start(device);
        self.report("Record", started)?;
        self.live.transport_mut().record();
        self.inform("Recording".to_string());
        Ok(())
    }

    /// Hand a chunk emitted by the capture device to the recorder
    pub fn push_capture_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        let pushed = self.recorder.push_chunk(chunk);
        self.report("Record", pushed)
    }

    /// Stop recording and load the captured audio as the current clip
    pub fn stop_recording(&mut self) -> Result<()> {
        let stopped = self.recorder.stop();
        self.live.transport_mut().stop_recording();
        let bytes = self.report("Record", stopped)?;
        let name = format!("recording-{}", Utc::now().format("%Y%m%d_%H%M%S"));
        self.load_bytes(&name, &bytes)
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    pub fn clip(&self) -> Option<&LoadedClip> {
        self.clip.as_ref()
    }

    pub fn preview(&self) -> Option<&PcmBuffer> {
        self.preview.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn playback(&self) -> Option<ActivePlayback> {
        self.live.active()
    }

    pub fn session_state(&self) -> SessionState {
        self.live.state()
    }

    /// The live session, for callers that drive it directly
    pub fn live(&self) -> &LiveSession<GraphProcessor> {
        &self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_wav;
    use crate::engine::sine_tone;

    fn wav_clip() -> Vec<u8> {
        encode_wav(&sine_tone(440.0, 0.5, 0.05, 8000)).unwrap()
    }

    #[test]
    fn test_load_sets_clip_and_preview() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();

        assert_eq!(studio.clip().unwrap().name, "voice.wav");
        assert!(studio.preview().is_some());
        assert!(!studio.status().unwrap().is_error());
    }

    #[test]
    fn test_bad_bytes_reset_clip() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();
        assert!(studio.load_bytes("notes.txt", b"hello there").is_err());

        assert!(studio.clip().is_none());
        assert!(studio.preview().is_none());
        let status = studio.status().unwrap();
        assert!(status.is_error());
        assert_eq!(status.code, Some("DECODE_ERROR"));
        assert!(status.message.contains("not supported"));
    }

    #[test]
    fn test_export_without_clip_stores_nothing() {
        let mut studio = Studio::default();
        let err = studio.export().unwrap_err();
        assert!(matches!(err, EchoClipError::NotLoaded));
        assert!(studio.history().is_empty());
        assert!(studio.status().unwrap().is_error());
    }

    #[test]
    fn test_export_adds_history_entry() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();
        let id = studio.export().unwrap();

        let entry = studio.history().get(id).unwrap();
        assert_eq!(entry.source_name, "voice.wav");
        assert_eq!(&entry.wav[0..4], b"RIFF");
        assert!(!entry.mp3.is_empty());
        assert_eq!(entry.processed.len(), studio.clip().unwrap().buffer.len());
    }

    #[test]
    fn test_set_params_clamps_and_refreshes_preview() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();
        let before = studio.preview().cloned().unwrap();

        studio
            .set_params(EffectParams {
                voice_boost: 10.0,
                feedback: 2.0,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(studio.params().voice_boost, 3.0);
        assert!(studio.params().feedback < 0.95);
        assert_ne!(studio.preview().unwrap(), &before);
    }

    #[test]
    fn test_failed_push_keeps_params_in_sync() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();
        studio.play(PlaybackCategory::Original).unwrap();
        // Engine without any of the nodes the session built
        *studio.live.backend_mut() = GraphProcessor::new(2, 44100);

        let err = studio
            .set_params(EffectParams {
                feedback: 0.1,
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err.error_code(), "RENDER_ERROR");
        assert_eq!(studio.params().feedback, 0.4);
        assert_eq!(studio.params(), studio.live().params());
    }

    #[test]
    fn test_echo_change_keeps_preview() {
        let mut studio = Studio::default();
        studio.load_bytes("voice.wav", &wav_clip()).unwrap();
        let before = studio.preview().cloned().unwrap();

        studio
            .set_params(EffectParams {
                delay_time: 0.8,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(studio.preview().unwrap(), &before);
    }

    #[test]
    fn test_unknown_history_item() {
        let mut studio = Studio::default();
        assert!(matches!(
            studio.play_history(42),
            Err(EchoClipError::HistoryItemNotFound { id: 42 })
        ));
    }
}
