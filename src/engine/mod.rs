//! Deadline timers driven by the audio clock. The owner passes `now` in;
//! nothing here reads a clock of its own.

pub mod scheduler;

pub use scheduler::{Scheduler, TimerId};
