use thiserror::Error;

use crate::graph::GraphError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoiceError {
    #[error("frequency must be a finite number above 0 Hz (got {0})")]
    InvalidFrequency(f32),

    #[error("duration must be a finite number of seconds above 0 (got {0})")]
    InvalidDuration(f64),

    #[error("repeat count must be between 1 and 10 (got {0})")]
    RepeatsOutOfRange(u32),

    #[error("audio backend rejected the voice: {0}")]
    Backend(#[from] GraphError),
}
