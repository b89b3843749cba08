//! Render history
//!
//! Bounded newest-first list of finished exports. Entries are created whole
//! from one render pass and never modified after insertion.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::EncodedAudio;
use crate::dsp::EffectParams;
use crate::engine::PcmBuffer;

/// Default maximum number of stored renders.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One finished export: processed audio plus both encodings of it.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Unique, increasing, derived from the creation time in milliseconds.
    pub id: u64,

    /// Name of the clip the render was made from.
    pub source_name: String,

    /// When the render finished.
    pub created_at: DateTime<Utc>,

    /// Settings the render used, after clamping.
    pub params: EffectParams,

    /// Processed samples.
    pub processed: PcmBuffer,

    /// RIFF/WAVE 16-bit PCM encoding of `processed`.
    pub wav: Vec<u8>,

    /// 128 kbps MP3 encoding of `processed`.
    pub mp3: Vec<u8>,

    /// Hex SHA-256 of `wav`.
    pub wav_sha256: String,

    /// Hex SHA-256 of `mp3`.
    pub mp3_sha256: String,
}

impl RenderResult {
    /// Assemble a result from a render and its encodings.
    pub fn new(
        id: u64,
        source_name: impl Into<String>,
        params: EffectParams,
        processed: PcmBuffer,
        encoded: EncodedAudio,
    ) -> Self {
        let EncodedAudio { wav, mp3 } = encoded;
        Self {
            id,
            source_name: source_name.into(),
            created_at: Utc::now(),
            params: params.clamped(),
            processed,
            wav_sha256: format!("{:x}", Sha256::digest(&wav)),
            mp3_sha256: format!("{:x}", Sha256::digest(&mp3)),
            wav,
            mp3,
        }
    }

    /// File name stem used when the render is saved to disk.
    pub fn file_stem(&self) -> String {
        let stem = self
            .source_name
            .rsplit_once('.')
            .map(|(s, _)| s)
            .unwrap_or(&self.source_name);
        format!("{}-echo-{}", stem, self.id)
    }

    /// Serializable description without the audio payloads.
    pub fn summary(&self) -> RenderSummary {
        RenderSummary {
            id: self.id,
            source_name: self.source_name.clone(),
            created_at: self.created_at,
            duration_secs: self.processed.duration_secs(),
            channels: self.processed.num_channels(),
            sample_rate: self.processed.sample_rate(),
            params: self.params,
            wav_bytes: self.wav.len(),
            mp3_bytes: self.mp3.len(),
            wav_sha256: self.wav_sha256.clone(),
            mp3_sha256: self.mp3_sha256.clone(),
        }
    }
}

/// Metadata of a render, as shown in listings and written by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub id: u64,
    pub source_name: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub channels: usize,
    pub sample_rate: u32,
    pub params: EffectParams,
    pub wav_bytes: usize,
    pub mp3_bytes: usize,
    pub wav_sha256: String,
    pub mp3_sha256: String,
}

/// Bounded, newest-first store of render results.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<RenderResult>,
    capacity: usize,
    last_id: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty history holding at most `capacity` entries (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            last_id: 0,
        }
    }

    /// Allocate the id for the next render.
    ///
    /// Uses the current time in milliseconds, bumped past the previous id
    /// when two renders land in the same millisecond.
    pub fn next_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Insert a result at the front.
    ///
    /// # Returns
    /// The oldest entry if the insertion pushed it past the capacity.
    pub fn insert(&mut self, result: RenderResult) -> Option<RenderResult> {
        log::debug!("History: storing render {}", result.id);
        self.entries.push_front(result);
        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_back();
            if let Some(old) = &evicted {
                log::debug!("History: evicted render {}", old.id);
            }
            evicted
        } else {
            None
        }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: u64) -> Option<&RenderResult> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Most recent entry.
    pub fn newest(&self) -> Option<&RenderResult> {
        self.entries.front()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &RenderResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
