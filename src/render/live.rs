//! Live monitoring session
//!
//! One long-lived graph per session, built on first use and never rebuilt.
//! Parameter changes become value pushes on the existing nodes, and playback
//! is exclusive across all categories.

use std::fmt;

use crate::dsp::EffectParams;
use crate::engine::{ActivePlayback, PcmBuffer, PlaybackCategory, TransportManager};
use crate::error::Result;
use crate::graph::{
    build_plan, realize, stage_update, GraphProcessor, GraphVariant, PlaybackBackend,
    PlaybackTarget, SourceId, Stage, StageMap,
};

/// Lifecycle of the monitoring graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No nodes exist yet
    #[default]
    Uninitialized,
    /// Graph built and wired; terminal
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "Uninitialized"),
            SessionState::Ready => write!(f, "Ready"),
        }
    }
}

/// Live session over a playback-capable backend
pub struct LiveSession<B: PlaybackBackend> {
    backend: B,
    stages: Option<StageMap<B::Handle>>,
    params: EffectParams,
    transport: TransportManager,
}

impl<B: PlaybackBackend> LiveSession<B> {
    /// Wrap a backend; nothing is built until the first playback
    ///
    /// # Arguments
    /// * `backend` - Engine that will own the monitoring graph
    /// * `params` - Settings the graph is built with when it is first needed
    pub fn new(backend: B, params: EffectParams) -> Self {
        Self {
            backend,
            stages: None,
            params: params.clamped(),
            transport: TransportManager::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.stages.is_some() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    /// Parameters the live graph currently reflects
    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    /// Build and wire the graph if this has not happened yet
    pub fn ensure_ready(&mut self) -> Result<()> {
        if self.stages.is_some() {
            return Ok(());
        }
        let plan = build_plan(&self.params, GraphVariant::Full);
        let stages = realize(&plan, &mut self.backend)?;
        log::info!("Live graph ready ({} nodes)", stages.len());
        self.stages = Some(stages);
        Ok(())
    }

    /// Push the difference between the current and `next` parameters
    ///
    /// Before the graph exists only the stored parameters change.
    ///
    /// # Returns
    /// Number of node values pushed
    pub fn apply_params(&mut self, next: &EffectParams) -> Result<usize> {
        let next = next.clamped();
        let updates = self.params.diff(&next);

        let pushed = match &self.stages {
            Some(stages) => {
                let now = self.backend.current_time();
                for update in &updates {
                    let (stage, param) = stage_update(update);
                    self.backend.set_param(stages.require(stage)?, param, now)?;
                }
                updates.len()
            }
            None => 0,
        };

        self.params = next;
        if pushed > 0 {
            log::debug!("Pushed {} live parameter updates", pushed);
        }
        Ok(pushed)
    }

    /// Start auditioning `buffer`, stopping whatever was playing
    ///
    /// Processed playback enters the effect chain; every other category goes
    /// straight to the output.
    pub fn play(&mut self, category: PlaybackCategory, buffer: PcmBuffer) -> Result<SourceId> {
        self.ensure_ready()?;
        self.stop_all();

        let target = match &self.stages {
            Some(stages) if category.uses_effects() => {
                PlaybackTarget::Node(stages.require(Stage::Source)?)
            }
            _ => PlaybackTarget::Destination,
        };

        let id = self.backend.start_source(buffer, target)?;
        self.transport.begin_playback(category, id);
        log::info!("Playing {}", category);
        Ok(id)
    }

    /// Stop every active playback immediately
    pub fn stop_all(&mut self) {
        if let Some(previous) = self.transport.end_playback() {
            self.backend.stop_source(previous.source);
        }
    }

    /// The playback still producing sound, if any
    pub fn active(&self) -> Option<ActivePlayback> {
        self.transport
            .active()
            .filter(|p| self.backend.is_playing(p.source))
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportManager {
        &mut self.transport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Stage handles of the built graph
    pub fn stages(&self) -> Option<&StageMap<B::Handle>> {
        self.stages.as_ref()
    }
}

impl LiveSession<GraphProcessor> {
    /// Session over the crate's own processor
    pub fn with_processor(channels: usize, sample_rate: u32, params: EffectParams) -> Self {
        Self::new(GraphProcessor::new(channels, sample_rate), params)
    }

    /// Pull the next `frames` frames of monitor output
    ///
    /// Called from the device callback (or a test). Finished playbacks are
    /// cleared afterwards.
    pub fn pull(&mut self, frames: usize) -> Result<PcmBuffer> {
        let out = self.backend.process(frames)?;
        let backend = &self.backend;
        self.transport.reap(|id| backend.is_playing(id));
        Ok(out)
    }
}
