//! Effect graph
//!
//! - [`topology`]: pure construction of the voice chain as a typed plan
//! - [`backend`]: node/connection interface a plan is realized onto
//! - [`processor`]: the crate's own sample-by-sample backend

pub mod backend;
pub mod node;
pub mod processor;
pub mod topology;

pub use backend::{
    realize, GraphBackend, GraphError, PlaybackBackend, PlaybackTarget, SourceId, StageMap,
};
pub use node::{NodeId, NodeKind, NodeParam, NodeSpec, PlannedNode, Stage};
pub use processor::{GraphProcessor, ProcessorNode};
pub use topology::{build_plan, stage_update, GraphPlan, GraphVariant, DRY_GAIN, WET_GAIN};
