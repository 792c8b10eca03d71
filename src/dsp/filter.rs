use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
State-variable filter (TPT form)
================================

| type      | passes       | rejects      |
| --------- | ------------ | ------------ |
| low-pass  | below cutoff | above cutoff |

The instrument only ever selects a low-pass at 120 Hz or 90 Hz to take the
edge off square and saw tones.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    kind: FilterKind,
}

/// Damping for a resonance-free response (Q = 0.5).
const DAMPING: f32 = 2.0;

impl SVFilter {
    pub fn new(kind: FilterKind, cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            kind,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterKind::LowPass, cutoff_hz)
    }

    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        // Keep the prewarp below Nyquist so tan() stays finite.
        let cutoff = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        let wd = TAU * cutoff;
        let wa = (2.0 * sample_rate) * (wd / (2.0 * sample_rate)).tan();
        wa / (2.0 * sample_rate)
    }

    #[inline]
    fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> f32 {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.kind {
            FilterKind::LowPass => v2,
        }
    }

    /// Filter `buffer` in place at the current cutoff.
    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let g = self.compute_g(sample_rate);

        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, DAMPING, g);
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }
}
