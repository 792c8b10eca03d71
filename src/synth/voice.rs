use std::fmt;

use super::error::VoiceError;
use crate::{engine::TimerId, graph::NodeId};

/// Upper bound on repetitions of an up-down sweep.
pub const MAX_REPEATS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub(crate) u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice {}", self.0)
    }
}

pub fn validate_frequency(frequency: f32) -> Result<f32, VoiceError> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(VoiceError::InvalidFrequency(frequency))
    }
}

pub fn validate_duration(seconds: f64) -> Result<f64, VoiceError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(VoiceError::InvalidDuration(seconds))
    }
}

/// A validated sweep. The only way to get one is [`SweepSpec::new`], so a
/// `SweepSpec` in hand is always playable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSpec {
    start: f32,
    end: f32,
    duration: f64,
    repeats: u32,
}

impl SweepSpec {
    pub fn new(start: f32, end: f32, duration: f64, repeats: u32) -> Result<Self, VoiceError> {
        if !(1..=MAX_REPEATS).contains(&repeats) {
            return Err(VoiceError::RepeatsOutOfRange(repeats));
        }
        Ok(Self {
            start: validate_frequency(start)?,
            end: validate_frequency(end)?,
            duration: validate_duration(duration)?,
            repeats,
        })
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    /// Length of one sweep (one up-down segment for repeated sweeps).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}

/// The graph nodes owned by one voice (or one segment of a repeated sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceNodes {
    pub oscillator: NodeId,
    pub gain: NodeId,
    pub filter: Option<NodeId>,
}

impl VoiceNodes {
    /// Every node, source first.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> {
        [Some(self.oscillator), self.filter, Some(self.gain)]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceKind {
    Note {
        frequency: f32,
    },
    Sweep {
        start: f32,
        end: f32,
    },
    RepeatedSweep {
        spec: SweepSpec,
        /// Zero-based index of the segment currently sounding.
        segment: u32,
        /// Scheduled end of that segment on the audio clock.
        segment_end: f64,
    },
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceKind::Note { frequency } => write!(f, "note {frequency:.2} Hz"),
            VoiceKind::Sweep { start, end } => write!(f, "sweep {start:.0} → {end:.0} Hz"),
            VoiceKind::RepeatedSweep { spec, segment, .. } => write!(
                f,
                "sweep {:.0} ⇄ {:.0} Hz ({}/{})",
                spec.start(),
                spec.end(),
                segment + 1,
                spec.repeats()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum VoicePhase {
    Sounding,
    /// Gain is ramping to zero; `teardown` releases the nodes at `until`.
    Fading { teardown: TimerId, until: f64 },
}

/// The one voice a `VoiceController` may own.
pub(crate) struct Voice {
    pub id: VoiceId,
    pub nodes: VoiceNodes,
    pub kind: VoiceKind,
    pub auto_stop: Option<TimerId>,
    pub phase: VoicePhase,
}

impl Voice {
    pub fn info(&self) -> VoiceInfo {
        VoiceInfo {
            id: self.id,
            nodes: self.nodes,
            kind: self.kind,
            fading_until: match self.phase {
                VoicePhase::Sounding => None,
                VoicePhase::Fading { until, .. } => Some(until),
            },
        }
    }
}

/// Read-only view of the active voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub nodes: VoiceNodes,
    pub kind: VoiceKind,
    /// When the fade-out completes, if one is in progress.
    pub fading_until: Option<f64>,
}

impl VoiceInfo {
    pub fn is_fading(&self) -> bool {
        self.fading_until.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_spec_bounds() {
        assert!(SweepSpec::new(30.0, 60.0, 2.0, 1).is_ok());
        assert!(SweepSpec::new(30.0, 60.0, 2.0, MAX_REPEATS).is_ok());
        assert_eq!(
            SweepSpec::new(30.0, 60.0, 2.0, 0),
            Err(VoiceError::RepeatsOutOfRange(0))
        );
        assert_eq!(
            SweepSpec::new(30.0, 60.0, 2.0, 11),
            Err(VoiceError::RepeatsOutOfRange(11))
        );
    }

    #[test]
    fn sweep_spec_rejects_bad_numbers() {
        assert!(matches!(
            SweepSpec::new(0.0, 60.0, 2.0, 1),
            Err(VoiceError::InvalidFrequency(_))
        ));
        assert!(matches!(
            SweepSpec::new(30.0, f32::NAN, 2.0, 1),
            Err(VoiceError::InvalidFrequency(_))
        ));
        assert!(matches!(
            SweepSpec::new(30.0, 60.0, f64::INFINITY, 1),
            Err(VoiceError::InvalidDuration(_))
        ));
        assert!(SweepSpec::new(0.1, 60.0, 2.0, 1).is_ok());
    }

    #[test]
    fn nodes_iterate_source_first() {
        let nodes = VoiceNodes {
            oscillator: NodeId(3),
            gain: NodeId(4),
            filter: Some(NodeId(5)),
        };
        let order: Vec<_> = nodes.iter().collect();
        assert_eq!(order, vec![NodeId(3), NodeId(5), NodeId(4)]);
    }
}
