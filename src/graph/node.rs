//! Graph node types
//!
//! A planned node is a [`Stage`] (its role in the voice chain) plus a
//! [`NodeSpec`] (its kind and initial settings).

use std::fmt;

use crate::dsp::BiquadConfig;

/// Identifier of a node inside a [`GraphPlan`](super::GraphPlan)
///
/// IDs are assigned sequentially in plan order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Node variant, independent of settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Source,
    Gain,
    Delay,
    Filter,
    Sink,
}

/// Role of a node in the voice chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    DryGain,
    WetGain,
    Delay,
    FeedbackGain,
    NoiseFilter,
    MasterGain,
    VoiceBoost,
    Clarity,
    Sink,
}

impl Stage {
    /// Stable name used in logs and graph dumps
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Source => "source",
            Stage::DryGain => "dry-gain",
            Stage::WetGain => "wet-gain",
            Stage::Delay => "delay",
            Stage::FeedbackGain => "feedback-gain",
            Stage::NoiseFilter => "noise-filter",
            Stage::MasterGain => "master-gain",
            Stage::VoiceBoost => "voice-boost-gain",
            Stage::Clarity => "clarity-filter",
            Stage::Sink => "sink",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind plus initial settings of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeSpec {
    Source,
    Gain { gain: f32 },
    Delay { delay_time: f32, max_delay_time: f32 },
    Filter(BiquadConfig),
    Sink,
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSpec::Source => NodeKind::Source,
            NodeSpec::Gain { .. } => NodeKind::Gain,
            NodeSpec::Delay { .. } => NodeKind::Delay,
            NodeSpec::Filter(_) => NodeKind::Filter,
            NodeSpec::Sink => NodeKind::Sink,
        }
    }
}

/// A value pushed onto an existing node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeParam {
    Gain(f32),
    DelayTime(f32),
    Filter(BiquadConfig),
}

impl NodeParam {
    /// Whether this parameter applies to a node of the given kind
    pub fn applies_to(&self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (NodeParam::Gain(_), NodeKind::Gain)
                | (NodeParam::DelayTime(_), NodeKind::Delay)
                | (NodeParam::Filter(_), NodeKind::Filter)
        )
    }
}

/// One node of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedNode {
    pub id: NodeId,
    pub stage: Stage,
    pub spec: NodeSpec,
}
