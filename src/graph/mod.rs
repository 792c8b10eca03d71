//! The audio backend: a schedulable node graph and the trait the voice layer
//! drives it through.
//!
//! Nodes wrap the DSP primitives with automation timelines, start/stop
//! times and wiring. Rendering a block carries out whatever was scheduled
//! for the times it covers and advances the graph's clock.

/// In-process graph implementation rendered by the output stream.
pub mod audio_graph;
/// The `AudioBackend` contract and its error type.
pub mod backend;
/// Node handles, parameter addresses and node bodies.
pub mod node;
/// `Arc<Mutex<_>>` handle for sharing a graph with the audio thread.
pub mod shared;

pub use audio_graph::{AudioGraph, OscillatorInfo};
pub use backend::{AudioBackend, GraphError};
pub use node::{NodeId, NodeKind, Param, RenderCtx, Target};
pub use shared::SharedGraph;
