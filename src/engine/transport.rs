//! Transport state for playback and recording
//!
//! Tracks which playback is audible and whether a recording is running.
//! Playback is exclusive across every category: starting any playback hands
//! back the one it replaces so the caller can stop its source first.

use std::fmt;

use crate::graph::SourceId;

/// Kind of buffer being auditioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackCategory {
    /// The loaded clip, unprocessed
    Original,
    /// The loaded clip through the live effect graph
    Processed,
    /// A stored render from history
    HistoryItem,
    /// The voice-only preview render
    Preview,
}

impl PlaybackCategory {
    /// Whether this category is routed through the effect graph
    pub fn uses_effects(&self) -> bool {
        matches!(self, PlaybackCategory::Processed)
    }
}

impl fmt::Display for PlaybackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackCategory::Original => write!(f, "Original"),
            PlaybackCategory::Processed => write!(f, "Processed"),
            PlaybackCategory::HistoryItem => write!(f, "History item"),
            PlaybackCategory::Preview => write!(f, "Preview"),
        }
    }
}

/// Transport states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Nothing playing, not recording (default state)
    #[default]
    Idle,
    /// One playback source is active
    Playing,
    /// Microphone capture in progress
    Recording,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Idle => write!(f, "Idle"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Recording => write!(f, "Recording"),
        }
    }
}

/// The single audible playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePlayback {
    pub category: PlaybackCategory,
    pub source: SourceId,
}

/// Playback and recording bookkeeping
///
/// Holds no audio. The owner of the backend stops the sources this manager
/// hands back.
#[derive(Debug, Clone, Default)]
pub struct TransportManager {
    playback: Option<ActivePlayback>,
    recording: bool,
}

impl TransportManager {
    /// Create an idle transport
    ///
    /// # Example
    /// ```
    /// use echoclip::engine::{TransportManager, TransportState};
    /// let transport = TransportManager::new();
    /// assert_eq!(transport.state(), TransportState::Idle);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Register a newly started playback
    ///
    /// # Returns
    /// The playback it replaces, which must be stopped by the caller
    pub fn begin_playback(
        &mut self,
        category: PlaybackCategory,
        source: SourceId,
    ) -> Option<ActivePlayback> {
        let previous = self.playback.replace(ActivePlayback { category, source });
        match previous {
            Some(prev) => log::debug!(
                "[TRANSPORT] {} playback replaces {} playback",
                category,
                prev.category
            ),
            None => log::debug!("[TRANSPORT] {} playback started", category),
        }
        previous
    }

    /// Forget the active playback and return it
    pub fn end_playback(&mut self) -> Option<ActivePlayback> {
        let previous = self.playback.take();
        if let Some(prev) = previous {
            log::debug!("[TRANSPORT] {} playback stopped", prev.category);
        }
        previous
    }

    /// Drop the active playback once its source has run out
    ///
    /// # Arguments
    /// * `is_playing` - Whether a source still has samples left
    pub fn reap(&mut self, is_playing: impl Fn(SourceId) -> bool) {
        if let Some(active) = self.playback {
            if !is_playing(active.source) {
                log::debug!("[TRANSPORT] {} playback finished", active.category);
                self.playback = None;
            }
        }
    }

    /// The playback currently audible, if any
    pub fn active(&self) -> Option<ActivePlayback> {
        self.playback
    }

    /// Check whether a category is the one audible right now
    pub fn is_playing(&self, category: PlaybackCategory) -> bool {
        self.playback.map(|p| p.category) == Some(category)
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Enter the recording state
    ///
    /// # Returns
    /// `false` if a recording was already running
    pub fn record(&mut self) -> bool {
        if self.recording {
            log::debug!("[TRANSPORT] Already recording");
            return false;
        }
        self.recording = true;
        log::debug!("[TRANSPORT] Recording started");
        true
    }

    /// Leave the recording state
    ///
    /// # Returns
    /// `false` if no recording was running
    pub fn stop_recording(&mut self) -> bool {
        if !self.recording {
            log::warn!("[TRANSPORT] Stop requested while not recording");
            return false;
        }
        self.recording = false;
        log::debug!("[TRANSPORT] Recording stopped");
        true
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// Current transport state; recording takes precedence
    pub fn state(&self) -> TransportState {
        if self.recording {
            TransportState::Recording
        } else if self.playback.is_some() {
            TransportState::Playing
        } else {
            TransportState::Idle
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let transport = TransportManager::new();
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(transport.active().is_none());
        assert!(!transport.is_recording());
    }

    #[test]
    fn test_begin_playback_returns_previous() {
        let mut transport = TransportManager::new();
        assert!(transport
            .begin_playback(PlaybackCategory::Original, SourceId(1))
            .is_none());

        let replaced = transport
            .begin_playback(PlaybackCategory::Processed, SourceId(2))
            .unwrap();
        assert_eq!(replaced.category, PlaybackCategory::Original);
        assert_eq!(replaced.source, SourceId(1));
        assert!(transport.is_playing(PlaybackCategory::Processed));
        assert!(!transport.is_playing(PlaybackCategory::Original));
    }

    #[test]
    fn test_same_category_also_replaced() {
        let mut transport = TransportManager::new();
        transport.begin_playback(PlaybackCategory::Preview, SourceId(1));
        let replaced = transport.begin_playback(PlaybackCategory::Preview, SourceId(2));
        assert_eq!(replaced.map(|p| p.source), Some(SourceId(1)));
    }

    #[test]
    fn test_end_playback() {
        let mut transport = TransportManager::new();
        transport.begin_playback(PlaybackCategory::HistoryItem, SourceId(7));
        assert_eq!(transport.state(), TransportState::Playing);
        assert_eq!(transport.end_playback().map(|p| p.source), Some(SourceId(7)));
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(transport.end_playback().is_none());
    }

    #[test]
    fn test_reap_finished_source() {
        let mut transport = TransportManager::new();
        transport.begin_playback(PlaybackCategory::Original, SourceId(3));
        transport.reap(|_| true);
        assert!(transport.active().is_some());
        transport.reap(|_| false);
        assert!(transport.active().is_none());
    }

    #[test]
    fn test_double_record_no_op() {
        let mut transport = TransportManager::new();
        assert!(transport.record());
        assert!(!transport.record());
        assert_eq!(transport.state(), TransportState::Recording);
        assert!(transport.stop_recording());
        assert!(!transport.stop_recording());
    }

    #[test]
    fn test_category_routing() {
        assert!(PlaybackCategory::Processed.uses_effects());
        assert!(!PlaybackCategory::Original.uses_effects());
        assert!(!PlaybackCategory::HistoryItem.uses_effects());
        assert!(!PlaybackCategory::Preview.uses_effects());
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackCategory::HistoryItem.to_string(), "History item");
        assert_eq!(TransportState::Recording.to_string(), "Recording");
    }
}
