//! Graph processor
//!
//! The crate's own signal-graph backend. Nodes are evaluated one frame at a
//! time in a precomputed order; inputs arriving on the same node are summed.
//!
//! Cycles are only allowed through a delay node. For ordering purposes the
//! edges *into* delay nodes are cut: a delay node emits the sample it stored
//! `d` frames ago before anything else runs, and stores the sum of its inputs
//! after every other node has produced the current frame.

use super::backend::{GraphBackend, GraphError, PlaybackBackend, PlaybackTarget, SourceId};
use super::node::{NodeKind, NodeParam, NodeSpec};
use crate::dsp::{BiquadCoeffs, BiquadState, DelayLine};
use crate::engine::{PcmBuffer, MAX_CHANNELS};
use crate::error;

/// Handle of a node inside a [`GraphProcessor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorNode(usize);

enum NodeState {
    Source,
    Gain {
        gain: f32,
    },
    Delay {
        lines: Vec<DelayLine>,
    },
    Filter {
        coeffs: BiquadCoeffs,
        states: Vec<BiquadState>,
    },
    Sink,
}

impl NodeState {
    fn kind(&self) -> NodeKind {
        match self {
            NodeState::Source => NodeKind::Source,
            NodeState::Gain { .. } => NodeKind::Gain,
            NodeState::Delay { .. } => NodeKind::Delay,
            NodeState::Filter { .. } => NodeKind::Filter,
            NodeState::Sink => NodeKind::Sink,
        }
    }
}

struct ProcNode {
    state: NodeState,
    inputs: Vec<usize>,
}

struct PendingChange {
    node: usize,
    param: NodeParam,
    frame: u64,
}

struct ActiveSource {
    id: SourceId,
    buffer: PcmBuffer,
    position: usize,
    target: Option<usize>,
}

/// Sample-by-sample executor for effect graphs
///
/// Used as the disposable engine of every offline render and as the
/// long-lived monitoring engine of the live session, which a device
/// callback drains with [`process`](Self::process).
pub struct GraphProcessor {
    sample_rate: u32,
    channels: usize,
    nodes: Vec<ProcNode>,
    order: Option<Vec<usize>>,
    /// Current frame output of every node, `[node * channels + channel]`
    outputs: Vec<f32>,
    /// Source samples injected into nodes this frame, same layout
    injected: Vec<f32>,
    direct: Vec<f32>,
    frame: u64,
    pending: Vec<PendingChange>,
    sources: Vec<ActiveSource>,
    next_source: u64,
}

impl GraphProcessor {
    /// Create an empty processor
    ///
    /// # Arguments
    /// * `channels` - Channel count of every node and of the output (1 or 2)
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            sample_rate,
            channels,
            nodes: Vec::new(),
            order: None,
            outputs: Vec::new(),
            injected: Vec::new(),
            direct: vec![0.0; channels],
            frame: 0,
            pending: Vec::new(),
            sources: Vec::new(),
            next_source: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of sources that still have samples to play
    pub fn active_sources(&self) -> usize {
        self.sources.len()
    }

    /// Frames processed since creation
    pub fn frames_processed(&self) -> u64 {
        self.frame
    }

    /// Run the graph for `frames` frames and return the mixed output
    pub fn process(&mut self, frames: usize) -> error::Result<PcmBuffer> {
        let order = match self.order.take() {
            Some(order) => order,
            None => self.evaluation_order()?,
        };

        let mut out = vec![Vec::with_capacity(frames); self.channels];
        for _ in 0..frames {
            self.step(&order);
            for (ch, samples) in out.iter_mut().enumerate() {
                samples.push(self.direct[ch]);
            }
        }
        self.order = Some(order);

        PcmBuffer::from_channels(out, self.sample_rate)
    }

    fn step(&mut self, order: &[usize]) {
        self.apply_due_changes();

        let ch_count = self.channels;
        self.injected.iter_mut().for_each(|s| *s = 0.0);
        self.direct.iter_mut().for_each(|s| *s = 0.0);

        for source in &mut self.sources {
            for ch in 0..ch_count {
                let sample = source_sample(&source.buffer, source.position, ch, ch_count);
                match source.target {
                    Some(node) => self.injected[node * ch_count + ch] += sample,
                    None => self.direct[ch] += sample,
                }
            }
            source.position += 1;
        }
        self.sources.retain(|s| s.position < s.buffer.len());

        let Self {
            nodes,
            outputs,
            injected,
            direct,
            ..
        } = self;

        for &idx in order {
            let node = &mut nodes[idx];
            for ch in 0..ch_count {
                let slot = idx * ch_count + ch;
                let value = if let NodeState::Delay { lines } = &node.state {
                    lines[ch].read()
                } else {
                    let input = injected[slot]
                        + node
                            .inputs
                            .iter()
                            .map(|&i| outputs[i * ch_count + ch])
                            .sum::<f32>();
                    match &mut node.state {
                        NodeState::Source | NodeState::Sink => input,
                        NodeState::Gain { gain } => input * *gain,
                        NodeState::Filter { coeffs, states } => states[ch].process(input, coeffs),
                        NodeState::Delay { .. } => unreachable!("delay handled above"),
                    }
                };
                outputs[slot] = value;
            }
        }

        for (idx, node) in nodes.iter_mut().enumerate() {
            if let NodeState::Delay { lines } = &mut node.state {
                for (ch, line) in lines.iter_mut().enumerate() {
                    let input = injected[idx * ch_count + ch]
                        + node
                            .inputs
                            .iter()
                            .map(|&i| outputs[i * ch_count + ch])
                            .sum::<f32>();
                    line.write(input);
                }
            }
        }

        for (idx, node) in nodes.iter().enumerate() {
            if node.state.kind() == NodeKind::Sink {
                for (ch, out) in direct.iter_mut().enumerate() {
                    *out += outputs[idx * ch_count + ch];
                }
            }
        }

        self.frame += 1;
    }

    fn apply_due_changes(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let now = self.frame;
        let (due, later): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|c| c.frame <= now);
        self.pending = later;
        for change in due {
            self.apply(change.node, change.param);
        }
    }

    fn apply(&mut self, node: usize, param: NodeParam) {
        let sample_rate = self.sample_rate;
        match (&mut self.nodes[node].state, param) {
            (NodeState::Gain { gain }, NodeParam::Gain(g)) => *gain = g,
            (NodeState::Delay { lines }, NodeParam::DelayTime(t)) => {
                for line in lines {
                    line.set_delay_secs(t, sample_rate);
                }
            }
            (NodeState::Filter { coeffs, .. }, NodeParam::Filter(cfg)) => {
                *coeffs = BiquadCoeffs::calculate(&cfg, sample_rate);
            }
            _ => {}
        }
    }

    /// Kahn's topological sort with the edges into delay nodes cut
    fn evaluation_order(&self) -> Result<Vec<usize>, GraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (to, node) in self.nodes.iter().enumerate() {
            if node.state.kind() == NodeKind::Delay {
                continue;
            }
            for &from in &node.inputs {
                in_degree[to] += 1;
                outgoing[from].push(to);
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        queue.reverse();
        let mut sorted = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for &to in &outgoing[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push(to);
                }
            }
        }

        if sorted.len() != n {
            return Err(GraphError::CycleWithoutDelay);
        }
        Ok(sorted)
    }

    fn check(&self, node: ProcessorNode) -> Result<usize, GraphError> {
        if node.0 < self.nodes.len() {
            Ok(node.0)
        } else {
            Err(GraphError::NodeNotFound(node.0))
        }
    }
}

/// Sample of `buffer` for output channel `ch`, up- or down-mixing as needed
fn source_sample(buffer: &PcmBuffer, position: usize, ch: usize, channels: usize) -> f32 {
    let src_channels = buffer.num_channels();
    if src_channels > channels {
        let sum: f32 = buffer.channels().iter().map(|c| c[position]).sum();
        sum / src_channels as f32
    } else {
        buffer.channel(ch.min(src_channels - 1))[position]
    }
}

impl GraphBackend for GraphProcessor {
    type Handle = ProcessorNode;

    fn create_node(&mut self, spec: &NodeSpec) -> Result<ProcessorNode, GraphError> {
        let channels = self.channels;
        let state = match *spec {
            NodeSpec::Source => NodeState::Source,
            NodeSpec::Sink => NodeState::Sink,
            NodeSpec::Gain { gain } => NodeState::Gain { gain },
            NodeSpec::Delay {
                delay_time,
                max_delay_time,
            } => {
                let mut line = DelayLine::new(max_delay_time, self.sample_rate);
                line.set_delay_secs(delay_time, self.sample_rate);
                NodeState::Delay {
                    lines: vec![line; channels],
                }
            }
            NodeSpec::Filter(config) => NodeState::Filter {
                coeffs: BiquadCoeffs::calculate(&config, self.sample_rate),
                states: vec![BiquadState::default(); channels],
            },
        };

        self.nodes.push(ProcNode {
            state,
            inputs: Vec::new(),
        });
        self.outputs.resize(self.nodes.len() * channels, 0.0);
        self.injected.resize(self.nodes.len() * channels, 0.0);
        self.order = None;
        Ok(ProcessorNode(self.nodes.len() - 1))
    }

    fn connect(&mut self, from: ProcessorNode, to: ProcessorNode) -> Result<(), GraphError> {
        let from = self.check(from)?;
        let to = self.check(to)?;
        self.nodes[to].inputs.push(from);
        self.order = None;
        Ok(())
    }

    fn set_param(
        &mut self,
        node: ProcessorNode,
        param: NodeParam,
        at_time: f64,
    ) -> Result<(), GraphError> {
        let idx = self.check(node)?;
        let kind = self.nodes[idx].state.kind();
        if !param.applies_to(kind) {
            return Err(GraphError::ParamMismatch { param, kind });
        }

        let frame = (at_time.max(0.0) * self.sample_rate as f64).round() as u64;
        if frame <= self.frame {
            self.apply(idx, param);
        } else {
            self.pending.push(PendingChange {
                node: idx,
                param,
                frame,
            });
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }
}

impl PlaybackBackend for GraphProcessor {
    fn start_source(
        &mut self,
        buffer: PcmBuffer,
        target: PlaybackTarget<ProcessorNode>,
    ) -> Result<SourceId, GraphError> {
        let target = match target {
            PlaybackTarget::Node(node) => Some(self.check(node)?),
            PlaybackTarget::Destination => None,
        };

        let id = SourceId(self.next_source);
        self.next_source += 1;
        if buffer.is_empty() {
            return Ok(id);
        }

        let buffer = if buffer.sample_rate() != self.sample_rate {
            log::debug!(
                "Resampling source {} from {} Hz to {} Hz",
                id.0,
                buffer.sample_rate(),
                self.sample_rate
            );
            buffer.resampled(self.sample_rate)
        } else {
            buffer
        };
        if !buffer.is_empty() {
            self.sources.push(ActiveSource {
                id,
                buffer,
                position: 0,
                target,
            });
        }
        Ok(id)
    }

    fn stop_source(&mut self, id: SourceId) {
        self.sources.retain(|s| s.id != id);
    }

    fn is_playing(&self, id: SourceId) -> bool {
        self.sources.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
fn filter_is_identity(p: &GraphProcessor, node: ProcessorNode) -> bool {
    match &p.nodes[node.0].state {
        NodeState::Filter { coeffs, .. } => coeffs.is_identity(),
        _ => false,
    }
}
