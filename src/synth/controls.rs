use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::Waveform;

/// Note length used when the duration control is empty or not a number.
pub const DEFAULT_DURATION: f64 = 1.0;

/// Low-pass choices offered by the filter selector. Mutually exclusive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilterChoice {
    #[default]
    None,
    LowPass120,
    LowPass90,
}

impl FilterChoice {
    pub const ALL: [FilterChoice; 3] = [
        FilterChoice::None,
        FilterChoice::LowPass120,
        FilterChoice::LowPass90,
    ];

    /// Cutoff in Hz, or `None` when the signal should bypass the filter.
    pub fn cutoff(self) -> Option<f32> {
        match self {
            FilterChoice::None => None,
            FilterChoice::LowPass120 => Some(120.0),
            FilterChoice::LowPass90 => Some(90.0),
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for FilterChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cutoff() {
            None => f.write_str("none"),
            Some(hz) => write!(f, "{hz:.0} Hz"),
        }
    }
}

impl FromStr for FilterChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_end_matches("hz").trim() {
            "none" | "off" => Ok(FilterChoice::None),
            "120" => Ok(FilterChoice::LowPass120),
            "90" => Ok(FilterChoice::LowPass90),
            other => Err(format!("unknown filter '{other}' (expected none, 120 or 90)")),
        }
    }
}

/// The control values a voice is built from, copied when the voice starts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// Note length in seconds.
    pub duration: f64,
    pub waveform: Waveform,
    pub filter: FilterChoice,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            waveform: Waveform::Sine,
            filter: FilterChoice::None,
        }
    }
}
