use super::error::ValidationError;
use crate::{
    dsp::Waveform,
    synth::{ControlSnapshot, FilterChoice, DEFAULT_DURATION, MAX_REPEATS},
};

/// Longest text a form field accepts.
const MAX_FIELD_LEN: usize = 10;

pub const SWEEP_DURATION_MIN: f64 = 0.5;
pub const SWEEP_DURATION_MAX: f64 = 30.0;
pub const SWEEP_DURATION_STEP: f64 = 0.5;

/// Range of the frequency knob, in whole Hz.
pub const KNOB_MIN: u32 = 25;
pub const KNOB_MAX: u32 = 55;
/// How long a knob tone rings before it stops itself.
pub const KNOB_NOTE_SECONDS: f64 = 9.0;

/// Editable text fields, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Duration,
    SweepStart,
    SweepTurnaround,
    Repeats,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Duration,
        Field::SweepStart,
        Field::SweepTurnaround,
        Field::Repeats,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Duration => "duration (s)",
            Field::SweepStart => "sweep start (Hz)",
            Field::SweepTurnaround => "turnaround (Hz)",
            Field::Repeats => "repeats",
        }
    }

    fn offset(self, by: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0) as isize;
        Self::ALL[(idx + by).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    FocusNext,
    FocusPrev,
    /// A character typed into the focused field.
    Input(char),
    Backspace,
    CycleWaveform,
    CycleFilter,
    SweepDurationUp,
    SweepDurationDown,
    KnobUp,
    KnobDown,
}

/// A sweep request that passed form validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRequest {
    pub start: f32,
    pub turnaround: f32,
    pub duration: f64,
    pub repeats: u32,
}

/// The state of every on-screen control.
///
/// Text fields hold exactly what was typed; they are only interpreted when a
/// voice is built (`snapshot`) or a sweep is requested (`sweep_request`).
#[derive(Debug, Clone)]
pub struct ControlSurface {
    duration: String,
    waveform: Waveform,
    filter: FilterChoice,
    sweep_start: String,
    sweep_turnaround: String,
    sweep_duration: f64,
    repeats: String,
    knob: u32,
    focus: Field,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self {
            duration: format_number(DEFAULT_DURATION),
            waveform: Waveform::Sine,
            filter: FilterChoice::None,
            sweep_start: "30".into(),
            sweep_turnaround: "60".into(),
            sweep_duration: 2.0,
            repeats: "4".into(),
            knob: KNOB_MIN,
            focus: Field::Duration,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = format_number(seconds);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_filter(mut self, filter: FilterChoice) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sweep(mut self, start: f32, turnaround: f32, repeats: u32) -> Self {
        self.sweep_start = format_number(start as f64);
        self.sweep_turnaround = format_number(turnaround as f64);
        self.repeats = repeats.to_string();
        self
    }

    pub fn with_sweep_duration(mut self, seconds: f64) -> Self {
        self.sweep_duration = clamp_sweep_duration(seconds);
        self
    }

    pub fn with_knob(mut self, hz: u32) -> Self {
        self.knob = hz.clamp(KNOB_MIN, KNOB_MAX);
        self
    }

    pub fn apply(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::FocusNext => self.focus = self.focus.offset(1),
            ControlEvent::FocusPrev => self.focus = self.focus.offset(-1),
            ControlEvent::Input(c) => {
                let field = self.field_mut(self.focus);
                if (c.is_ascii_digit() || c == '.' || c == '-') && field.len() < MAX_FIELD_LEN {
                    field.push(c);
                }
            }
            ControlEvent::Backspace => {
                self.field_mut(self.focus).pop();
            }
            ControlEvent::CycleWaveform => self.waveform = self.waveform.next(),
            ControlEvent::CycleFilter => self.filter = self.filter.next(),
            ControlEvent::SweepDurationUp => {
                self.sweep_duration = clamp_sweep_duration(self.sweep_duration + SWEEP_DURATION_STEP)
            }
            ControlEvent::SweepDurationDown => {
                self.sweep_duration = clamp_sweep_duration(self.sweep_duration - SWEEP_DURATION_STEP)
            }
            ControlEvent::KnobUp => self.knob = (self.knob + 1).min(KNOB_MAX),
            ControlEvent::KnobDown => self.knob = self.knob.saturating_sub(1).max(KNOB_MIN),
        }
    }

    /// Note length in seconds. Anything that isn't a positive number falls
    /// back to [`DEFAULT_DURATION`].
    pub fn duration(&self) -> f64 {
        match self.duration.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
            _ => DEFAULT_DURATION,
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            duration: self.duration(),
            waveform: self.waveform,
            filter: self.filter,
        }
    }

    pub fn sweep_request(&self) -> Result<SweepRequest, ValidationError> {
        let start = parse_frequency("start frequency", &self.sweep_start)?;
        let turnaround = parse_frequency("turnaround frequency", &self.sweep_turnaround)?;
        let repeats = match self.repeats.trim().parse::<u32>() {
            Ok(n) if (1..=MAX_REPEATS).contains(&n) => n,
            _ => {
                return Err(ValidationError::Repeats {
                    input: self.repeats.clone(),
                })
            }
        };

        Ok(SweepRequest {
            start,
            turnaround,
            duration: self.sweep_duration,
            repeats,
        })
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Duration => &self.duration,
            Field::SweepStart => &self.sweep_start,
            Field::SweepTurnaround => &self.sweep_turnaround,
            Field::Repeats => &self.repeats,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Duration => &mut self.duration,
            Field::SweepStart => &mut self.sweep_start,
            Field::SweepTurnaround => &mut self.sweep_turnaround,
            Field::Repeats => &mut self.repeats,
        }
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn filter(&self) -> FilterChoice {
        self.filter
    }

    pub fn sweep_duration(&self) -> f64 {
        self.sweep_duration
    }

    /// Knob position in Hz, always within `KNOB_MIN..=KNOB_MAX`.
    pub fn knob(&self) -> u32 {
        self.knob
    }

    pub fn knob_label(&self) -> String {
        format!("{} Hz", self.knob)
    }

    /// What a knob tone plays with: a plain sine, whatever the other
    /// controls say.
    pub fn knob_snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            duration: KNOB_NOTE_SECONDS,
            waveform: Waveform::Sine,
            filter: FilterChoice::None,
        }
    }

    /// The slider's visible label.
    pub fn sweep_duration_label(&self) -> String {
        format!("{:.1} s", self.sweep_duration)
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_frequency(field: &'static str, input: &str) -> Result<f32, ValidationError> {
    let value = input
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            input: input.to_string(),
        })?;
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(value)
}

fn clamp_sweep_duration(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.clamp(SWEEP_DURATION_MIN, SWEEP_DURATION_MAX)
    } else {
        SWEEP_DURATION_MIN
    }
}

// 1.0 -> "1", 0.25 -> "0.25"
fn format_number(value: f64) -> String {
    let s = format!("{value}");
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_fields(start: &str, turnaround: &str, repeats: &str) -> ControlSurface {
        let mut surface = ControlSurface::new();
        surface.sweep_start = start.into();
        surface.sweep_turnaround = turnaround.into();
        surface.repeats = repeats.into();
        surface
    }

    #[test]
    fn repeats_boundaries() {
        assert!(with_fields("30", "60", "1").sweep_request().is_ok());
        assert!(with_fields("30", "60", "10").sweep_request().is_ok());
        for bad in ["0", "11", "-1", "2.5", "", "four"] {
            assert!(
                matches!(
                    with_fields("30", "60", bad).sweep_request(),
                    Err(ValidationError::Repeats { .. })
                ),
                "repeats {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn frequency_boundaries() {
        assert_eq!(
            with_fields("0", "60", "1").sweep_request(),
            Err(ValidationError::NotPositive {
                field: "start frequency"
            })
        );
        assert!(with_fields("-5", "60", "1").sweep_request().is_err());
        assert!(with_fields("30", "-60", "1").sweep_request().is_err());
        assert!(matches!(
            with_fields("inf", "60", "1").sweep_request(),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(matches!(
            with_fields("abc", "60", "1").sweep_request(),
            Err(ValidationError::NotANumber { .. })
        ));

        let ok = with_fields("0.1", "60", "3").sweep_request().unwrap();
        assert_eq!(ok.start, 0.1);
        assert_eq!(ok.turnaround, 60.0);
        assert_eq!(ok.repeats, 3);
    }

    #[test]
    fn bad_duration_falls_back_to_default() {
        let mut surface = ControlSurface::new();
        for text in ["", "abc", "0", "-2", "NaN"] {
            surface.duration = text.into();
            assert_eq!(surface.duration(), DEFAULT_DURATION, "duration {text:?}");
        }
        surface.duration = "2.5".into();
        assert_eq!(surface.snapshot().duration, 2.5);
    }

    #[test]
    fn typing_edits_the_focused_field() {
        let mut surface = ControlSurface::new();
        surface.apply(ControlEvent::FocusNext);
        assert_eq!(surface.focus(), Field::SweepStart);

        surface.apply(ControlEvent::Backspace);
        surface.apply(ControlEvent::Backspace);
        surface.apply(ControlEvent::Input('4'));
        surface.apply(ControlEvent::Input('x'));
        surface.apply(ControlEvent::Input('5'));
        assert_eq!(surface.field(Field::SweepStart), "45");

        surface.apply(ControlEvent::FocusPrev);
        surface.apply(ControlEvent::FocusPrev);
        assert_eq!(surface.focus(), Field::Repeats);
    }

    #[test]
    fn slider_clamps_and_labels() {
        let mut surface = ControlSurface::new().with_sweep_duration(0.5);
        surface.apply(ControlEvent::SweepDurationDown);
        assert_eq!(surface.sweep_duration(), SWEEP_DURATION_MIN);
        surface.apply(ControlEvent::SweepDurationUp);
        assert_eq!(surface.sweep_duration_label(), "1.0 s");
    }

    #[test]
    fn builders_seed_the_fields() {
        let surface = ControlSurface::new()
            .with_duration(0.25)
            .with_sweep(25.0, 55.0, 2)
            .with_waveform(Waveform::Square)
            .with_filter(FilterChoice::LowPass120);
        assert_eq!(surface.field(Field::Duration), "0.25");
        assert_eq!(surface.field(Field::SweepStart), "25");
        let snapshot = surface.snapshot();
        assert_eq!(snapshot.waveform, Waveform::Square);
        assert_eq!(snapshot.filter, FilterChoice::LowPass120);
    }

    #[test]
    fn knob_steps_in_whole_hz_within_range() {
        let mut surface = ControlSurface::new();
        assert_eq!(surface.knob(), KNOB_MIN);
        surface.apply(ControlEvent::KnobDown);
        assert_eq!(surface.knob(), 25);

        surface.apply(ControlEvent::KnobUp);
        surface.apply(ControlEvent::KnobUp);
        assert_eq!(surface.knob_label(), "27 Hz");

        let mut surface = ControlSurface::new().with_knob(100);
        assert_eq!(surface.knob(), KNOB_MAX);
        surface.apply(ControlEvent::KnobUp);
        assert_eq!(surface.knob(), 55);
        assert_eq!(ControlSurface::new().with_knob(3).knob(), KNOB_MIN);
    }

    #[test]
    fn knob_tone_ignores_waveform_and_filter() {
        let surface = ControlSurface::new()
            .with_waveform(Waveform::Square)
            .with_filter(FilterChoice::LowPass90)
            .with_duration(0.25);
        let snapshot = surface.knob_snapshot();
        assert_eq!(snapshot.waveform, Waveform::Sine);
        assert_eq!(snapshot.filter, FilterChoice::None);
        assert_eq!(snapshot.duration, KNOB_NOTE_SECONDS);
    }
}
