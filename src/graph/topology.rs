//! Effect graph topology
//!
//! Pure construction of the fixed voice chain from effect parameters.
//! The shape never depends on parameter values; only node settings do.
//!
//! ```text
//! source ──► dry-gain ───────────────────────► master-gain
//!    └─────► wet-gain ► delay ──┬──► noise-filter ► master-gain
//!                                └──► feedback-gain ► delay
//! master-gain ► voice-boost-gain ► clarity-filter ► sink
//! ```
//!
//! The voice preview variant drops the echo section:
//! `source ► noise-filter ► voice-boost-gain ► clarity-filter ► sink`.

use crate::dsp::{EffectParams, ParamUpdate, MAX_DELAY_SECS};

use super::node::{NodeId, NodeParam, NodeSpec, PlannedNode, Stage};

/// Dry and wet paths are summed at full level
pub const DRY_GAIN: f32 = 1.0;

/// See [`DRY_GAIN`]
pub const WET_GAIN: f32 = 1.0;

/// Which chain to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphVariant {
    /// Echo plus voice enhancement
    #[default]
    Full,
    /// Voice enhancement only (noise filter, boost, clarity)
    VoicePreview,
}

/// Nodes and connections of one graph instance
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPlan {
    variant: GraphVariant,
    nodes: Vec<PlannedNode>,
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphPlan {
    fn new(variant: GraphVariant) -> Self {
        Self {
            variant,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn add(&mut self, stage: Stage, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PlannedNode { id, stage, spec });
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.edges.push((from, to));
    }

    pub fn variant(&self) -> GraphVariant {
        self.variant
    }

    pub fn nodes(&self) -> &[PlannedNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// Find the node playing a stage, if the variant has one
    pub fn node(&self, stage: Stage) -> Option<&PlannedNode> {
        self.nodes.iter().find(|n| n.stage == stage)
    }

    /// Stages directly fed by `stage`
    pub fn successors(&self, stage: Stage) -> Vec<Stage> {
        let Some(from) = self.node(stage) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|(f, _)| *f == from.id)
            .map(|(_, to)| self.nodes[to.index()].stage)
            .collect()
    }
}

/// Build the graph plan for a parameter set
///
/// Parameters are clamped before any value is placed on a node.
pub fn build_plan(params: &EffectParams, variant: GraphVariant) -> GraphPlan {
    let params = params.clamped();
    let mut plan = GraphPlan::new(variant);

    let source = plan.add(Stage::Source, NodeSpec::Source);
    let noise = plan.add(Stage::NoiseFilter, NodeSpec::Filter(params.noise_filter()));
    let boost = plan.add(
        Stage::VoiceBoost,
        NodeSpec::Gain {
            gain: params.voice_boost,
        },
    );
    let clarity = plan.add(Stage::Clarity, NodeSpec::Filter(params.clarity_filter()));
    let sink = plan.add(Stage::Sink, NodeSpec::Sink);

    match variant {
        GraphVariant::Full => {
            let dry = plan.add(Stage::DryGain, NodeSpec::Gain { gain: DRY_GAIN });
            let wet = plan.add(Stage::WetGain, NodeSpec::Gain { gain: WET_GAIN });
            let delay = plan.add(
                Stage::Delay,
                NodeSpec::Delay {
                    delay_time: params.delay_time,
                    max_delay_time: MAX_DELAY_SECS,
                },
            );
            let feedback = plan.add(
                Stage::FeedbackGain,
                NodeSpec::Gain {
                    gain: params.feedback,
                },
            );
            let master = plan.add(Stage::MasterGain, NodeSpec::Gain { gain: 1.0 });

            plan.connect(source, dry);
            plan.connect(source, wet);
            plan.connect(dry, master);
            plan.connect(wet, delay);
            plan.connect(delay, noise);
            plan.connect(delay, feedback);
            plan.connect(feedback, delay);
            plan.connect(noise, master);
            plan.connect(master, boost);
        }
        GraphVariant::VoicePreview => {
            plan.connect(source, noise);
            plan.connect(noise, boost);
        }
    }

    plan.connect(boost, clarity);
    plan.connect(clarity, sink);
    plan
}

/// Map a parameter update onto the stage and node value it changes
pub fn stage_update(update: &ParamUpdate) -> (Stage, NodeParam) {
    match *update {
        ParamUpdate::DelayTime(t) => (Stage::Delay, NodeParam::DelayTime(t)),
        ParamUpdate::Feedback(g) => (Stage::FeedbackGain, NodeParam::Gain(g)),
        ParamUpdate::NoiseFilter(cfg) => (Stage::NoiseFilter, NodeParam::Filter(cfg)),
        ParamUpdate::VoiceBoost(g) => (Stage::VoiceBoost, NodeParam::Gain(g)),
        ParamUpdate::Clarity(cfg) => (Stage::Clarity, NodeParam::Filter(cfg)),
    }
}
