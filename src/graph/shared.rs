use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    audio_graph::AudioGraph,
    backend::{AudioBackend, GraphError},
    node::{NodeId, Param, Target},
};
use crate::dsp::{filter::FilterKind, Waveform};

/// An [`AudioGraph`] shared between the control thread and the audio callback.
///
/// The audio thread holds the lock for one `render` call; the control side
/// holds it for one backend call. Neither side ever holds it across the
/// other's work.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<Mutex<AudioGraph>>,
}

impl SharedGraph {
    pub fn new(graph: AudioGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph. A panic on the other side of the lock leaves the graph
    /// structurally valid, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, AudioGraph> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }
}

impl AudioBackend for SharedGraph {
    fn now(&self) -> f64 {
        self.lock().now()
    }

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.lock().create_oscillator(waveform, frequency)
    }

    fn create_gain(&mut self, value: f32) -> NodeId {
        self.lock().create_gain(value)
    }

    fn create_filter(&mut self, kind: FilterKind, cutoff: f32) -> NodeId {
        self.lock().create_filter(kind, cutoff)
    }

    fn connect(&mut self, from: NodeId, to: Target) -> Result<(), GraphError> {
        self.lock().connect(from, to)
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.lock().disconnect(node)
    }

    fn set_value_at(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError> {
        self.lock().set_value_at(param, value, time)
    }

    fn linear_ramp_to(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError> {
        self.lock().linear_ramp_to(param, value, time)
    }

    fn cancel_scheduled(&mut self, param: Param, from: f64) -> Result<(), GraphError> {
        self.lock().cancel_scheduled(param, from)
    }

    fn param_value(&self, param: Param, time: f64) -> Result<f32, GraphError> {
        self.lock().param_value(param, time)
    }

    fn start(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError> {
        self.lock().start(oscillator, time)
    }

    fn stop(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError> {
        self.lock().stop(oscillator, time)
    }

    fn take_finished(&mut self) -> Vec<NodeId> {
        self.lock().take_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_one_clock() {
        let graph = SharedGraph::new(AudioGraph::new(1_000.0));
        let audio = graph.clone();

        thread::spawn(move || {
            let mut out = [0.0f32; 250];
            audio.render(&mut out);
        })
        .join()
        .unwrap();

        assert!((graph.now() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn nodes_created_through_the_handle_render() {
        let mut graph = SharedGraph::new(AudioGraph::new(1_000.0));
        let osc = graph.create_oscillator(Waveform::Square, 125.0);
        graph.connect(osc, Target::Output).unwrap();
        graph.start(osc, 0.0).unwrap();

        let mut out = [0.0f32; 8];
        graph.render(&mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(graph.lock().node_count(), 1);
    }
}
