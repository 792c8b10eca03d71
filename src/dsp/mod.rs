//! Low-level DSP primitives used by the audio graph nodes.
//!
//! These components are allocation-free and realtime-safe once constructed.
//! They stay focused on the signal-processing math; the graph layer owns
//! connections, clocks and scheduling.

/// Schedulable parameter values (set-at-time and linear ramps).
pub mod automation;
/// State-variable low-pass filter.
pub mod filter;
/// Phase-accumulating oscillator waveforms.
pub mod oscillator;

pub use automation::Automation;
pub use filter::SVFilter;
pub use oscillator::{Oscillator, Waveform};
