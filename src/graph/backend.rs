use thiserror::Error;

use super::node::{NodeId, NodeKind, Param, Target};
use crate::dsp::{filter::FilterKind, Waveform};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node {0} does not exist (already disconnected?)")]
    UnknownNode(NodeId),

    #[error("cannot connect {from} to {to:?}: would break render order")]
    InvalidConnection { from: NodeId, to: Target },

    #[error("node {node} is not a {expected:?} node")]
    WrongNodeKind { node: NodeId, expected: NodeKind },

    #[error("oscillator {0} was already started")]
    AlreadyStarted(NodeId),

    #[error("oscillator {0} was never started")]
    NotStarted(NodeId),
}

/// Everything the voice layer needs from an audio output graph.
///
/// Times are seconds on the backend's own monotonic clock (`now`). Scheduling
/// is declarative: calls record what should happen at a time and return
/// immediately. Rendering, wherever it happens, carries it out.
pub trait AudioBackend {
    /// Current audio clock time in seconds.
    fn now(&self) -> f64;

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId;

    fn create_gain(&mut self, value: f32) -> NodeId;

    fn create_filter(&mut self, kind: FilterKind, cutoff: f32) -> NodeId;

    fn connect(&mut self, from: NodeId, to: Target) -> Result<(), GraphError>;

    /// Remove a node's connections and release it. The id is dead afterwards.
    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError>;

    fn set_value_at(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError>;

    /// Ramp linearly from the previous scheduled value to `value`, arriving at `time`.
    fn linear_ramp_to(&mut self, param: Param, value: f32, time: f64) -> Result<(), GraphError>;

    /// Drop every automation event on `param` scheduled at or after `from`.
    fn cancel_scheduled(&mut self, param: Param, from: f64) -> Result<(), GraphError>;

    /// Value `param` has (or will have) at `time`, per its current schedule.
    fn param_value(&self, param: Param, time: f64) -> Result<f32, GraphError>;

    /// Start an oscillator at `time`. Oscillators are single-shot.
    fn start(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError>;

    /// Schedule (or reschedule) the end of an oscillator. No-op once finished.
    fn stop(&mut self, oscillator: NodeId, time: f64) -> Result<(), GraphError>;

    /// Drain "oscillator finished" notifications raised since the last call.
    fn take_finished(&mut self) -> Vec<NodeId>;
}
