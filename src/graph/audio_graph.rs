use std::collections::BTreeMap;

use tracing::trace;

use super::{
    backend::{AudioBackend, GraphError},
    node::{GraphNode, NodeBody, NodeId, NodeKind, OscillatorNode, Param, RenderCtx, Target},
};
use crate::{
    dsp::{filter::FilterKind, Automation, Waveform},
    MAX_BLOCK_SIZE,
};

/*
Audio Graph
===========

A tiny pull-free render graph: oscillators feed (optional) filters, filters
feed gains, gains feed the output bus.

    osc ──▶ filter ──▶ gain ──▶ Output
     └───────────────▶ gain ──▶ Output

Nodes are rendered stage by stage (oscillators, then filters, then gains),
each summing the buffers of its inputs, which were filled earlier in the
same block. Connections that would point backwards in that order are
rejected, so there is no need for a topological sort.

The clock is the number of frames rendered so far. Nothing happens between
renders: scheduled automation, oscillator starts/stops and finished
notifications all take effect as the blocks covering their times are
rendered. Offline rendering is therefore exactly as deterministic as the
realtime stream.
*/

/// Start/stop bookkeeping for an oscillator, for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorInfo {
    pub waveform: Waveform,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub finished: bool,
}

pub struct AudioGraph {
    sample_rate: f32,
    frames: u64,
    next_id: u32,
    nodes: BTreeMap<NodeId, GraphNode>,
    /// Node ids sorted by render stage.
    order: Vec<NodeId>,
    finished: Vec<NodeId>,
    mix: Vec<f32>,
    scratch: Vec<f32>,
}

impl AudioGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
            next_id: 0,
            nodes: BTreeMap::new(),
            order: Vec::new(),
            finished: Vec::new(),
            mix: vec![0.0; MAX_BLOCK_SIZE],
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn outputs(&self, node: NodeId) -> Option<&[Target]> {
        self.nodes.get(&node).map(|n| n.outputs.as_slice())
    }

    /// Live nodes of one kind, in creation order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind() == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn oscillator_info(&self, node: NodeId) -> Option<OscillatorInfo> {
        match &self.nodes.get(&node)?.body {
            NodeBody::Oscillator(osc) => Some(OscillatorInfo {
                waveform: osc.osc.waveform(),
                start: osc.start,
                stop: osc.stop,
                finished: osc.finished,
            }),
            _ => None,
        }
    }

    /// Render the mono mix into `out`, advancing the clock by `out.len()` frames.
    pub fn render(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    /// Render and discard `seconds` of audio. Used to move the clock offline.
    pub fn advance(&mut self, seconds: f64) {
        let mut frames = (seconds * self.sample_rate as f64).round().max(0.0) as usize;
        let mut sink = [0.0f32; 256];
        while frames > 0 {
            let n = frames.min(sink.len());
            self.render(&mut sink[..n]);
            frames -= n;
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let frames = out.len();
        let ctx = RenderCtx {
            sample_rate: self.sample_rate,
            time: self.now(),
        };
        let block_end = ctx.end_time(frames);

        let Self {
            nodes,
            order,
            finished,
            mix,
            scratch,
            ..
        } = self;

        for id in order.iter() {
            let mix = &mut mix[..frames];
            mix.fill(0.0);
            if let Some(node) = nodes.get(id) {
                for src in &node.inputs {
                    if let Some(src) = nodes.get(src) {
                        for (m, &s) in mix.iter_mut().zip(&src.buf[..frames]) {
                            *m += s;
                        }
                    }
                }
            }

            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            node.render(mix, scratch, frames, &ctx);

            if let NodeBody::Oscillator(osc) = &mut node.body {
                if !osc.finished && osc.stop.is_some_and(|stop| stop <= block_end) {
                    osc.finished = true;
                    finished.push(*id);
                    trace!(node = %id, "oscillator finished");
                }
            }
        }

        out.fill(0.0);
        for node in nodes.values() {
            if node.outputs.contains(&Target::Output) {
                for (o, &s) in out.iter_mut().zip(&node.buf[..frames]) {
                    *o += s;
                }
            }
        }

        self.frames += frames as u64;
        let now = self.now();
        for node in self.nodes.values_mut() {
            node.retire_automation(now);
        }
    }

    fn insert(&mut self, node: GraphNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.rebuild_order();
        id
    }

    fn rebuild_order(&mut self) {
        let nodes = &self.nodes;
        self.order.clear();
        self.order.extend(nodes.keys().copied());
        self.order.sort_by_key(|id| (nodes[id].kind().stage(), *id));
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut GraphNode, GraphError> {
        self.nodes.get_mut(&node).ok_or(GraphError::UnknownNode(node))
    }

    fn oscillator_mut(&mut self, node: NodeId) -> Result<&mut OscillatorNode, GraphError> {
        match &mut self.node_mut(node)?.body {
            NodeBody::Oscillator(osc) => Ok(osc),
            _ => Err(GraphError::WrongNodeKind {
                node,
                expected: NodeKind::Oscillator,
            }),
        }
    }

    fn automation_mut(&mut self, param: Param) -> Result<&mut Automation, GraphError> {
        let node = param.node();
        let expected = expected_kind(param);
        self.node_mut(node)?
            .automation_mut(param)
            .ok_or(GraphError::WrongNodeKind { node, expected })
    }
}

fn expected_kind(param: Param) -> NodeKind {
    match param {
        Param::Frequency(_) => NodeKind::Oscillator,
        Param::Gain(_) => NodeKind::Gain,
        Param::Cutoff(_) => NodeKind::Filter,
    }
}

impl AudioBackend for AudioGraph {
    fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.insert(GraphNode::oscillator(waveform, frequency))
    }

    fn create_gain(&mut self, value: f32) -> NodeId {
        self.insert(GraphNode::gain(value))
    }

    fn create_filter(&mut self, kind: FilterKind, cutoff: f32) -> NodeId {
        self.insert(GraphNode::filter(kind, cutoff))
    }

    fn connect(&mut self, from: NodeId, to: Target) -> Result<(), GraphError> {
        let from_stage = self
            .nodes
            .get(&from)
            .ok_or(GraphError::UnknownNode(from))?
            .kind()
            .stage();

        if let Target::Node(dest) = to {
            let dest_node = self.node_mut(dest)?;
            if dest_node.kind().stage() <= from_stage {
                return Err(GraphError::InvalidConnection { from, to });
            }
            if !dest_node.inputs.contains(&from) {
                dest_node.inputs.push(from);
            }
        }

        let src = self.node_mut(from)?;
        if !src.outputs.contains(&to) {
            src.outputs.push(to);
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        let removed = self
            .nodes
            .remove(&node)
            .ok_or(GraphError::UnknownNode(node))?;

        for target in &removed.outputs {
            if let Target::Node(dest) = target {
                if let Some(dest) = self.nodes.get_mut(dest) {
                    dest.inputs.retain(|id| *id != node);
                }
            }
        }
        for src in &removed.inputs {
            if let Some(src) = self.nodes.get_mut(src) {
                src.outputs.retain(|t| *t != Target::Node(node));
            }
        }

        self.rebuild_order();
        trace!(node = %node, "disconnected");
        Ok(())
    }

    fn set_value_at(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError> {
        self.automation_mut(param)?.set_value_at(value, time);
        Ok(())
    }

    fn linear_ramp_to(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError> {
        self.automation_mut(param)?.linear_ramp_to(value, time);
        Ok(())
    }

    fn cancel_scheduled(&mut self, param: Param, from: f64) -> Result<(), GraphError> {
        self.automation_mut(param)?.cancel_from(from);
        Ok(())
    }

    fn param_value(&self, param: Param, time: f64) -> Result<f32, GraphError> {
        let node = param.node();
        self.nodes
            .get(&node)
            .ok_or(GraphError::UnknownNode(node))?
            .automation(param)
            .map(|a| a.value_at(time))
            .ok_or(GraphError::WrongNodeKind {
                node,
                expected: expected_kind(param),
            })
    }

    fn start(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError> {
        let osc = self.oscillator_mut(oscillator)?;
        if osc.start.is_some() {
            return Err(GraphError::AlreadyStarted(oscillator));
        }
        osc.start = Some(time);
        Ok(())
    }

    fn stop(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError> {
        let osc = self.oscillator_mut(oscillator)?;
        if osc.start.is_none() {
            return Err(GraphError::NotStarted(oscillator));
        }
        if !osc.finished {
            osc.stop = Some(time);
        }
        Ok(())
    }

    fn take_finished(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn voice(graph: &mut AudioGraph, frequency: f32) -> (NodeId, NodeId) {
        let osc = graph.create_oscillator(Waveform::Square, frequency);
        let gain = graph.create_gain(1.0);
        graph.connect(osc, Target::Node(gain)).unwrap();
        graph.connect(gain, Target::Output).unwrap();
        (osc, gain)
    }

    #[test]
    fn silent_until_started() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, _) = voice(&mut graph, 125.0);

        let mut out = [1.0f32; 16];
        graph.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        graph.start(osc, graph.now()).unwrap();
        graph.render(&mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[4], -1.0);
    }

    #[test]
    fn clock_advances_with_rendered_frames() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        assert_eq!(graph.now(), 0.0);
        graph.advance(0.5);
        assert!((graph.now() - 0.5).abs() < 1e-9);
        let mut out = vec![0.0f32; 4_000];
        graph.render(&mut out);
        assert!((graph.now() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn gain_automation_scales_output() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, gain) = voice(&mut graph, 125.0);
        graph.start(osc, 0.0).unwrap();
        graph.set_value_at(Param::Gain(gain), 0.5, 0.0).unwrap();

        let mut out = [0.0f32; 8];
        graph.render(&mut out);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[7], -0.5);
    }

    #[test]
    fn stop_raises_one_finished_notification() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, _) = voice(&mut graph, 50.0);
        graph.start(osc, 0.0).unwrap();
        graph.stop(osc, 0.1).unwrap();

        graph.advance(0.05);
        assert!(graph.take_finished().is_empty());

        let mut out = [0.0f32; 100];
        graph.render(&mut out);
        assert_eq!(graph.take_finished(), vec![osc]);
        // Samples at or after the stop time are silent.
        assert!(out[51..].iter().all(|&s| s == 0.0));

        graph.advance(0.5);
        assert!(graph.take_finished().is_empty());
        assert!(graph.oscillator_info(osc).unwrap().finished);
    }

    #[test]
    fn oscillators_are_single_shot() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, gain) = voice(&mut graph, 50.0);
        assert_eq!(graph.stop(osc, 0.0), Err(GraphError::NotStarted(osc)));
        graph.start(osc, 0.0).unwrap();
        assert_eq!(graph.start(osc, 0.1), Err(GraphError::AlreadyStarted(osc)));
        assert!(matches!(
            graph.start(gain, 0.0),
            Err(GraphError::WrongNodeKind { .. })
        ));
    }

    #[test]
    fn disconnect_releases_the_node_once() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, gain) = voice(&mut graph, 50.0);
        graph.start(osc, 0.0).unwrap();

        graph.disconnect(gain).unwrap();
        assert!(!graph.contains(gain));
        assert_eq!(graph.outputs(osc), Some(&[][..]));
        assert_eq!(graph.disconnect(gain), Err(GraphError::UnknownNode(gain)));

        let mut out = [1.0f32; 32];
        graph.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        graph.disconnect(osc).unwrap();
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn backwards_connections_are_rejected() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, gain) = voice(&mut graph, 50.0);
        let filter = graph.create_filter(FilterKind::LowPass, 90.0);

        assert!(graph.connect(osc, Target::Node(filter)).is_ok());
        assert!(graph.connect(filter, Target::Node(gain)).is_ok());
        assert_eq!(
            graph.connect(gain, Target::Node(filter)),
            Err(GraphError::InvalidConnection {
                from: gain,
                to: Target::Node(filter)
            })
        );
    }

    #[test]
    fn frequency_ramp_is_visible_through_param_value() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let (osc, _) = voice(&mut graph, 90.0);
        let freq = Param::Frequency(osc);
        graph.set_value_at(freq, 90.0, 0.0).unwrap();
        graph.linear_ramp_to(freq, 20.0, 5.0).unwrap();

        assert!((graph.param_value(freq, 2.5).unwrap() - 55.0).abs() < 1e-4);
        graph.advance(3.0);
        assert!((graph.param_value(freq, graph.now()).unwrap() - 48.0).abs() < 1e-3);
    }
}
