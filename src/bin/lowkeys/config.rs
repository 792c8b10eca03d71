//! Command-line options. Everything here only seeds the initial state of the
//! control panel; all of it can be changed while running.

use std::path::PathBuf;

use clap::Parser;
use lowkeys::{
    dsp::Waveform,
    input::ControlSurface,
    synth::{FilterChoice, DEFAULT_DURATION, MAX_REPEATS},
};

#[derive(Debug, Parser)]
#[command(name = "lowkeys")]
#[command(about = "Play sub-bass notes and sweeps from the terminal keyboard")]
pub struct Args {
    /// Note length in seconds
    #[arg(short, long, default_value_t = DEFAULT_DURATION)]
    pub duration: f64,

    /// sine, square, sawtooth or triangle
    #[arg(short, long, default_value = "sine")]
    pub waveform: Waveform,

    /// Low-pass filter: none, 120 or 90 (Hz)
    #[arg(short, long, default_value = "none")]
    pub filter: FilterChoice,

    /// Repeated sweep start frequency in Hz
    #[arg(long, default_value_t = 30.0)]
    pub sweep_start: f32,

    /// Repeated sweep turnaround frequency in Hz
    #[arg(long, default_value_t = 60.0)]
    pub sweep_turnaround: f32,

    /// Length of one up-down sweep in seconds
    #[arg(long, default_value_t = 2.0)]
    pub sweep_duration: f64,

    #[arg(short, long, default_value_t = 4,
          value_parser = clap::value_parser!(u32).range(1..=MAX_REPEATS as i64))]
    pub repeats: u32,

    /// Where to write the log; the terminal belongs to the UI
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "lowkeys=trace"
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("lowkeys.log"))
    }

    pub fn controls(&self) -> ControlSurface {
        ControlSurface::new()
            .with_duration(self.duration)
            .with_waveform(self.waveform)
            .with_filter(self.filter)
            .with_sweep(self.sweep_start, self.sweep_turnaround, self.repeats)
            .with_sweep_duration(self.sweep_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowkeys::input::Field;

    #[test]
    fn defaults_match_the_panel() {
        let args = Args::parse_from(["lowkeys"]);
        let controls = args.controls();
        assert_eq!(controls.field(Field::Duration), "1");
        assert_eq!(controls.field(Field::Repeats), "4");
        assert_eq!(controls.waveform(), Waveform::Sine);
        assert_eq!(controls.filter(), FilterChoice::None);
    }

    #[test]
    fn parses_choices() {
        let args = Args::parse_from(["lowkeys", "-w", "saw", "-f", "90", "-r", "10"]);
        assert_eq!(args.waveform, Waveform::Sawtooth);
        assert_eq!(args.filter, FilterChoice::LowPass90);
        assert!(Args::try_parse_from(["lowkeys", "-r", "11"]).is_err());
    }
}
