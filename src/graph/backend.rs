//! Signal-graph backend interface
//!
//! A backend owns real nodes and connections. The same [`realize`] call wires
//! a [`GraphPlan`] onto the long-lived monitoring backend and onto each
//! disposable offline backend, so the wiring exists in one place.

use std::fmt::Debug;

use thiserror::Error;

use super::node::{NodeKind, NodeParam, NodeSpec, Stage};
use super::topology::GraphPlan;
use crate::engine::PcmBuffer;
use crate::error::EchoClipError;

/// Errors raised by a backend while building or driving a graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(usize),

    #[error("parameter {param:?} does not apply to a {kind:?} node")]
    ParamMismatch { param: NodeParam, kind: NodeKind },

    #[error("cycle without a delay node")]
    CycleWithoutDelay,

    #[error("source {0} not found")]
    SourceNotFound(u64),

    #[error("graph has no stage '{0}'")]
    MissingStage(Stage),
}

impl From<GraphError> for EchoClipError {
    fn from(e: GraphError) -> Self {
        EchoClipError::Render {
            reason: e.to_string(),
        }
    }
}

/// Node and connection primitives of an audio engine
pub trait GraphBackend {
    /// Backend-specific node reference
    type Handle: Copy + Eq + Debug;

    /// Instantiate a node with its initial settings
    fn create_node(&mut self, spec: &NodeSpec) -> Result<Self::Handle, GraphError>;

    /// Route the output of `from` into the input of `to`
    fn connect(&mut self, from: Self::Handle, to: Self::Handle) -> Result<(), GraphError>;

    /// Change a node setting, effective at `at_time` seconds on the
    /// backend's clock (immediately if that time has passed)
    fn set_param(
        &mut self,
        node: Self::Handle,
        param: NodeParam,
        at_time: f64,
    ) -> Result<(), GraphError>;

    /// Current transport time in seconds
    fn current_time(&self) -> f64;
}

/// Identifier of a transient playback source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// Where a transient source is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTarget<H> {
    /// Into a graph node (the entry point of the effect chain)
    Node(H),
    /// Straight to the output, bypassing every effect
    Destination,
}

/// Transient buffer sources on top of a graph backend
pub trait PlaybackBackend: GraphBackend {
    /// Start playing `buffer` into `target` from its beginning
    fn start_source(
        &mut self,
        buffer: PcmBuffer,
        target: PlaybackTarget<Self::Handle>,
    ) -> Result<SourceId, GraphError>;

    /// Stop a source immediately; unknown or finished sources are ignored
    fn stop_source(&mut self, id: SourceId);

    /// Whether a source still has samples left to play
    fn is_playing(&self, id: SourceId) -> bool;
}

/// Backend handles of a realized plan, by stage
#[derive(Debug, Clone)]
pub struct StageMap<H> {
    entries: Vec<(Stage, H)>,
}

impl<H: Copy> StageMap<H> {
    /// Handle for a stage, if the plan had it
    pub fn get(&self, stage: Stage) -> Option<H> {
        self.entries
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, h)| *h)
    }

    /// Handle for a stage, or a `MissingStage` error
    pub fn require(&self, stage: Stage) -> Result<H, GraphError> {
        self.get(stage).ok_or(GraphError::MissingStage(stage))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Create every node of `plan` on `backend` and wire its connections once
pub fn realize<B: GraphBackend>(
    plan: &GraphPlan,
    backend: &mut B,
) -> Result<StageMap<B::Handle>, GraphError> {
    let mut handles = Vec::with_capacity(plan.nodes().len());
    for node in plan.nodes() {
        handles.push(backend.create_node(&node.spec)?);
    }

    for (from, to) in plan.edges() {
        backend.connect(handles[from.index()], handles[to.index()])?;
    }

    log::debug!(
        "Realized {:?} graph: {} nodes, {} connections",
        plan.variant(),
        handles.len(),
        plan.edges().len()
    );

    Ok(StageMap {
        entries: plan
            .nodes()
            .iter()
            .map(|n| n.stage)
            .zip(handles)
            .collect(),
    })
}
