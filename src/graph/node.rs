use std::fmt;

use crate::{
    dsp::{filter::FilterKind, Automation, Oscillator, SVFilter, Waveform},
    MAX_BLOCK_SIZE,
};

/// Handle to a node living in an [`AudioGraph`](super::AudioGraph).
///
/// Ids are never reused, so a stale handle can't alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    /// The device output (the mix bus).
    Output,
}

/// A schedulable parameter on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Frequency(NodeId),
    Gain(NodeId),
    Cutoff(NodeId),
}

impl Param {
    pub fn node(self) -> NodeId {
        match self {
            Param::Frequency(id) | Param::Gain(id) | Param::Cutoff(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator,
    Filter,
    Gain,
}

impl NodeKind {
    /// Render order. A node may only feed nodes of a later stage, which keeps
    /// the graph acyclic without a topological sort.
    pub(crate) fn stage(self) -> u8 {
        match self {
            NodeKind::Oscillator => 0,
            NodeKind::Filter => 1,
            NodeKind::Gain => 2,
        }
    }
}

/// Context passed to nodes while rendering one block.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    /// Audio clock time of the first sample in the block, in seconds.
    pub time: f64,
}

impl RenderCtx {
    #[inline]
    pub fn time_of(&self, sample: usize) -> f64 {
        self.time + sample as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn end_time(&self, frames: usize) -> f64 {
        self.time_of(frames)
    }
}

/// Single-shot oscillator: started once, stopped once, never restarted.
pub(crate) struct OscillatorNode {
    pub osc: Oscillator,
    pub frequency: Automation,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub finished: bool,
}

impl OscillatorNode {
    fn render(&mut self, out: &mut [f32], freq_buf: &mut [f32], ctx: &RenderCtx) {
        let Some(start) = self.start else {
            out.fill(0.0);
            return;
        };
        let stop = self.stop.unwrap_or(f64::INFINITY);

        self.frequency.fill(freq_buf, ctx.time, ctx.sample_rate);
        for (i, (o, &freq)) in out.iter_mut().zip(freq_buf.iter()).enumerate() {
            let t = ctx.time_of(i);
            *o = if t >= start && t < stop {
                self.osc.next_sample(freq, ctx.sample_rate)
            } else {
                0.0
            };
        }
    }
}

pub(crate) struct GainNode {
    pub gain: Automation,
}

impl GainNode {
    fn render(&mut self, input: &[f32], out: &mut [f32], gain_buf: &mut [f32], ctx: &RenderCtx) {
        self.gain.fill(gain_buf, ctx.time, ctx.sample_rate);
        for ((o, &x), &g) in out.iter_mut().zip(input).zip(gain_buf.iter()) {
            *o = x * g;
        }
    }
}

pub(crate) struct FilterNode {
    pub filter: SVFilter,
    pub cutoff: Automation,
}

impl FilterNode {
    fn render(&mut self, input: &[f32], out: &mut [f32], ctx: &RenderCtx) {
        // Cutoff is control-rate: one value per block.
        self.filter.set_cutoff(self.cutoff.value_at(ctx.time));
        out.copy_from_slice(input);
        self.filter.render(out, ctx.sample_rate);
    }
}

pub(crate) enum NodeBody {
    Oscillator(OscillatorNode),
    Filter(FilterNode),
    Gain(GainNode),
}

/// A node plus its wiring and render buffer.
pub(crate) struct GraphNode {
    pub body: NodeBody,
    pub inputs: Vec<NodeId>,
    pub outputs: Vec<Target>,
    pub buf: Vec<f32>,
}

impl GraphNode {
    pub fn oscillator(waveform: Waveform, frequency: f32) -> Self {
        Self::new(NodeBody::Oscillator(OscillatorNode {
            osc: Oscillator::new(waveform),
            frequency: Automation::new(frequency),
            start: None,
            stop: None,
            finished: false,
        }))
    }

    pub fn gain(value: f32) -> Self {
        Self::new(NodeBody::Gain(GainNode {
            gain: Automation::new(value),
        }))
    }

    pub fn filter(kind: FilterKind, cutoff: f32) -> Self {
        Self::new(NodeBody::Filter(FilterNode {
            filter: SVFilter::new(kind, cutoff),
            cutoff: Automation::new(cutoff),
        }))
    }

    fn new(body: NodeBody) -> Self {
        Self {
            body,
            inputs: Vec::with_capacity(2),
            outputs: Vec::with_capacity(1),
            buf: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Oscillator(_) => NodeKind::Oscillator,
            NodeBody::Filter(_) => NodeKind::Filter,
            NodeBody::Gain(_) => NodeKind::Gain,
        }
    }

    /// The automation behind `param`, if this node owns that kind of parameter.
    pub fn automation(&self, param: Param) -> Option<&Automation> {
        match (&self.body, param) {
            (NodeBody::Oscillator(n), Param::Frequency(_)) => Some(&n.frequency),
            (NodeBody::Gain(n), Param::Gain(_)) => Some(&n.gain),
            (NodeBody::Filter(n), Param::Cutoff(_)) => Some(&n.cutoff),
            _ => None,
        }
    }

    pub fn automation_mut(&mut self, param: Param) -> Option<&mut Automation> {
        match (&mut self.body, param) {
            (NodeBody::Oscillator(n), Param::Frequency(_)) => Some(&mut n.frequency),
            (NodeBody::Gain(n), Param::Gain(_)) => Some(&mut n.gain),
            (NodeBody::Filter(n), Param::Cutoff(_)) => Some(&mut n.cutoff),
            _ => None,
        }
    }

    /// Render `frames` samples into `self.buf`, reading the summed inputs
    /// from `input`. `scratch` holds per-sample parameter values.
    pub fn render(&mut self, input: &[f32], scratch: &mut [f32], frames: usize, ctx: &RenderCtx) {
        let out = &mut self.buf[..frames];
        let scratch = &mut scratch[..frames];
        match &mut self.body {
            NodeBody::Oscillator(n) => n.render(out, scratch, ctx),
            NodeBody::Filter(n) => n.render(&input[..frames], out, ctx),
            NodeBody::Gain(n) => n.render(&input[..frames], out, scratch, ctx),
        }
    }

    pub fn retire_automation(&mut self, time: f64) {
        match &mut self.body {
            NodeBody::Oscillator(n) => n.frequency.retire_before(time),
            NodeBody::Filter(n) => n.cutoff.retire_before(time),
            NodeBody::Gain(n) => n.gain.retire_before(time),
        }
    }
}
