// Purpose: single-voice lifecycle on top of an AudioBackend
// Everything that decides what is sounding lives in this layer

pub mod controller;
pub mod controls;
pub mod error;
pub mod voice;

pub use controller::{VoiceController, FADE_OUT, SUPERSEDE_RAMP};
pub use controls::{ControlSnapshot, FilterChoice, DEFAULT_DURATION};
pub use error::VoiceError;
pub use voice::{SweepSpec, VoiceId, VoiceInfo, VoiceKind, VoiceNodes, MAX_REPEATS};
