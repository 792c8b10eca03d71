pub mod dsp;
pub mod engine; // Timer scheduling on the audio clock
pub mod graph; // Schedulable audio graph (the backend)
pub mod input; // Keyboard/mouse/control routing
pub mod synth; // Single-voice lifecycle management

pub const MAX_BLOCK_SIZE: usize = 2048;
