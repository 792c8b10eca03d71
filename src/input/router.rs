use std::collections::{HashMap, HashSet};

use tracing::{debug, error, trace, warn};

use super::{
    keymap::Keymap,
    surface::{ControlEvent, ControlSurface},
};
use crate::{
    engine::{Scheduler, TimerId},
    graph::AudioBackend,
    synth::{VoiceController, VoiceError},
};

/// Downward sweep bound to the drop control: 90 Hz to 20 Hz.
pub const DROP: (f32, f32) = (90.0, 20.0);
/// Upward sweep bound to the rise control: 20 Hz to 90 Hz.
pub const RISE: (f32, f32) = (20.0, 90.0);
/// Length of the drop and rise sweeps, in seconds.
pub const SWEEP_SECONDS: f64 = 5.0;

/// A user gesture, already stripped of any terminal specifics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(char),
    KeyUp(char),
    /// Click on the on-screen key bound to this letter.
    MouseDown(char),
    /// The pointer left the on-screen key bound to this letter.
    MouseLeave(char),
    Drop,
    Rise,
    /// Start a repeated sweep with the parameters in the form.
    Sweep,
    /// Play a sine tone at the knob's frequency.
    Knob,
    StopAll,
    /// Silence everything and put every control back where it started.
    Reset,
    Control(ControlEvent),
}

#[derive(Debug, Clone, Copy)]
enum KeyTimer {
    /// The key's light goes out.
    Unlight(char),
    /// Without release events, the key counts as released again.
    Forget(char),
}

/// Turns [`InputEvent`]s into voice operations and tracks which keys are lit.
///
/// "Active" is purely visual: a key lights up when its note starts and goes
/// dark on key-up, on mouse-leave, or once the note's duration has elapsed,
/// whichever comes first.
pub struct InputRouter<B: AudioBackend> {
    voices: VoiceController<B>,
    keymap: Keymap,
    controls: ControlSurface,
    /// What `Reset` restores.
    initial_controls: ControlSurface,
    /// Keys held down, used to swallow auto-repeat.
    pressed: HashSet<char>,
    active: HashMap<char, TimerId>,
    timers: Scheduler<KeyTimer>,
    release_events: bool,
    audio_error: Option<String>,
    message: Option<String>,
}

impl<B: AudioBackend> InputRouter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            voices: VoiceController::new(backend),
            keymap: Keymap::new(),
            controls: ControlSurface::new(),
            initial_controls: ControlSurface::new(),
            pressed: HashSet::new(),
            active: HashMap::new(),
            timers: Scheduler::new(),
            release_events: true,
            audio_error: None,
            message: None,
        }
    }

    pub fn with_controls(mut self, controls: ControlSurface) -> Self {
        self.initial_controls = controls.clone();
        self.controls = controls;
        self
    }

    /// Set to `false` when the terminal never reports key releases. Held keys
    /// are then forgotten when their note's duration runs out.
    pub fn with_release_events(mut self, enabled: bool) -> Self {
        self.release_events = enabled;
        self
    }

    pub fn handle(&mut self, event: InputEvent) {
        trace!(?event, "input");
        match event {
            InputEvent::KeyDown(key) => {
                let Some(key) = self.mapped(key) else { return };
                if !self.pressed.insert(key) {
                    return;
                }
                if !self.play_key(key) {
                    self.pressed.remove(&key);
                } else if !self.release_events {
                    let until = self.voices.now() + self.controls.duration();
                    self.timers.schedule(until, KeyTimer::Forget(key));
                }
            }
            InputEvent::KeyUp(key) => {
                let Some(key) = self.mapped(key) else { return };
                self.pressed.remove(&key);
                self.voices.stop();
                self.deactivate(key);
            }
            InputEvent::MouseDown(key) => {
                if let Some(key) = self.mapped(key) {
                    self.play_key(key);
                }
            }
            InputEvent::MouseLeave(key) => {
                if let Some(key) = self.mapped(key) {
                    self.deactivate(key);
                }
            }
            InputEvent::Drop => self.sweep(DROP),
            InputEvent::Rise => self.sweep(RISE),
            InputEvent::Sweep => self.repeated_sweep(),
            InputEvent::Knob => self.knob_tone(),
            InputEvent::StopAll => {
                self.voices.stop();
            }
            InputEvent::Reset => self.reset(),
            InputEvent::Control(event) => self.controls.apply(event),
        }
    }

    /// Advance voice timers and expire visual key marks. Call once per frame.
    pub fn tick(&mut self) {
        self.voices.tick();

        let now = self.voices.now();
        for (id, timer) in self.timers.drain_due(now) {
            match timer {
                KeyTimer::Unlight(key) => {
                    if self.active.get(&key) == Some(&id) {
                        self.active.remove(&key);
                    }
                }
                KeyTimer::Forget(key) => {
                    self.pressed.remove(&key);
                }
            }
        }
    }

    /// Enter the audio-disabled state. Only the first reason is kept; play
    /// events are ignored from now on.
    pub fn disable_audio(&mut self, reason: impl Into<String>) {
        if self.audio_error.is_some() {
            return;
        }
        let reason = reason.into();
        error!(%reason, "audio disabled");
        self.message = Some(format!("audio unavailable: {reason}"));
        self.audio_error = Some(reason);
    }

    pub fn audio_error(&self) -> Option<&str> {
        self.audio_error.as_deref()
    }

    /// Latest user-facing status message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_active(&self, key: char) -> bool {
        self.active.contains_key(&key.to_ascii_lowercase())
    }

    pub fn active_keys(&self) -> impl Iterator<Item = char> + '_ {
        self.active.keys().copied()
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn voices(&self) -> &VoiceController<B> {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceController<B> {
        &mut self.voices
    }

    fn mapped(&self, key: char) -> Option<char> {
        match self.keymap.binding(key) {
            Some(binding) => Some(binding.key),
            None => {
                warn!(%key, "no note bound to key");
                None
            }
        }
    }

    /// Play the note bound to `key` and light it. Returns whether a voice
    /// started.
    fn play_key(&mut self, key: char) -> bool {
        if self.audio_error.is_some() {
            return false;
        }
        let Some(frequency) = self.keymap.frequency(key) else {
            return false;
        };
        let controls = self.controls.snapshot();
        let result = self.voices.play_note(frequency, &controls);
        if !self.report(result) {
            return false;
        }
        self.deactivate(key);
        let until = self.voices.now() + controls.duration;
        let timer = self.timers.schedule(until, KeyTimer::Unlight(key));
        self.active.insert(key, timer);
        true
    }

    fn knob_tone(&mut self) {
        if self.audio_error.is_some() {
            return;
        }
        let frequency = self.controls.knob() as f32;
        let result = self.voices.play_note(frequency, &self.controls.knob_snapshot());
        self.report(result);
    }

    fn reset(&mut self) {
        self.voices.stop();
        self.controls = self.initial_controls.clone();
        self.pressed.clear();
        self.active.clear();
        self.timers = Scheduler::new();
        if self.audio_error.is_none() {
            self.message = None;
        }
        debug!("controls reset");
    }

    fn sweep(&mut self, (start, end): (f32, f32)) {
        if self.audio_error.is_some() {
            return;
        }
        let result = self.voices.play_sweep(start, end, SWEEP_SECONDS);
        self.report(result);
    }

    fn repeated_sweep(&mut self) {
        if self.audio_error.is_some() {
            return;
        }
        match self.controls.sweep_request() {
            Ok(req) => {
                let result = self.voices.play_repeated_sweep(
                    req.start,
                    req.turnaround,
                    req.duration,
                    req.repeats,
                );
                self.report(result);
            }
            Err(err) => {
                debug!(%err, "sweep form rejected");
                self.message = Some(err.to_string());
            }
        }
    }

    fn deactivate(&mut self, key: char) {
        if let Some(timer) = self.active.remove(&key) {
            self.timers.cancel(timer);
        }
    }

    /// Record the outcome of a play call in the status line.
    fn report<T>(&mut self, result: Result<T, VoiceError>) -> bool {
        match result {
            Ok(_) => {
                if self.audio_error.is_none() {
                    self.message = None;
                }
                true
            }
            Err(err) => {
                warn!(%err, "could not start voice");
                self.message = Some(err.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::Waveform,
        graph::AudioGraph,
        input::surface::{Field, KNOB_MIN},
        synth::{FilterChoice, VoiceKind},
    };

    const SAMPLE_RATE: f32 = 1_000.0;

    fn router() -> InputRouter<AudioGraph> {
        InputRouter::new(AudioGraph::new(SAMPLE_RATE))
    }

    fn run(router: &mut InputRouter<AudioGraph>, seconds: f64) {
        let steps = (seconds * 100.0).round() as usize;
        for _ in 0..steps {
            router.voices_mut().backend_mut().advance(0.01);
            router.tick();
        }
    }

    #[test]
    fn key_repeat_is_swallowed() {
        let mut r = router();
        r.handle(InputEvent::KeyDown('a'));
        let first = r.voices().active_voice().unwrap().id;
        r.handle(InputEvent::KeyDown('a'));
        r.handle(InputEvent::KeyDown('A'));
        assert_eq!(r.voices().active_voice().unwrap().id, first);
        assert!(r.is_active('a'));
    }

    #[test]
    fn key_up_fades_and_clears_the_mark() {
        let mut r = router();
        r.handle(InputEvent::KeyDown('q'));
        r.handle(InputEvent::KeyUp('q'));
        assert!(!r.is_active('q'));
        assert!(r.voices().active_voice().unwrap().is_fading());

        // Released, so the next press plays again.
        r.handle(InputEvent::KeyDown('q'));
        assert!(!r.voices().active_voice().unwrap().is_fading());
    }

    #[test]
    fn mark_expires_after_the_note_duration() {
        let mut r = router().with_controls(ControlSurface::new().with_duration(0.5));
        r.handle(InputEvent::KeyDown('z'));
        run(&mut r, 0.4);
        assert!(r.is_active('z'));
        run(&mut r, 0.2);
        assert!(!r.is_active('z'));

        // Release reporting is on: the key is still held.
        r.handle(InputEvent::KeyDown('z'));
        assert!(r.voices().active_voice().unwrap().is_fading());
    }

    #[test]
    fn without_release_events_a_held_key_retriggers() {
        let mut r = router()
            .with_controls(ControlSurface::new().with_duration(0.5))
            .with_release_events(false);
        r.handle(InputEvent::KeyDown('z'));
        let first = r.voices().active_voice().unwrap().id;
        run(&mut r, 0.6);

        r.handle(InputEvent::KeyDown('z'));
        let second = r.voices().active_voice().unwrap().id;
        assert_ne!(first, second);
        assert!(r.is_active('z'));
    }

    #[test]
    fn without_release_events_mouse_leave_does_not_strand_a_held_key() {
        let mut r = router()
            .with_controls(ControlSurface::new().with_duration(0.5))
            .with_release_events(false);
        r.handle(InputEvent::KeyDown('a'));
        r.handle(InputEvent::MouseDown('a'));
        r.handle(InputEvent::MouseLeave('a'));
        run(&mut r, 3.0);
        assert!(r.voices().is_idle());

        r.handle(InputEvent::KeyDown('a'));
        assert!(r.voices().active_voice().is_some());
        assert!(r.is_active('a'));
    }

    #[test]
    fn a_key_that_plays_nothing_is_not_held() {
        let mut r = router().with_release_events(false);
        r.disable_audio("no output device");
        r.handle(InputEvent::KeyDown('a'));
        assert!(r.pressed.is_empty());
        assert!(r.timers.is_empty());
    }

    #[test]
    fn mouse_leave_only_clears_the_mark() {
        let mut r = router();
        r.handle(InputEvent::MouseDown('g'));
        assert!(r.is_active('g'));
        r.handle(InputEvent::MouseLeave('g'));
        assert!(!r.is_active('g'));

        let voice = r.voices().active_voice().unwrap();
        assert!(!voice.is_fading());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut r = router();
        r.handle(InputEvent::KeyDown('7'));
        r.handle(InputEvent::MouseDown('!'));
        assert!(r.voices().is_idle());
        assert_eq!(r.active_keys().count(), 0);
    }

    #[test]
    fn invalid_sweep_form_sets_a_message_and_plays_nothing() {
        let mut r = router().with_controls(ControlSurface::new().with_sweep(30.0, 60.0, 11));
        r.handle(InputEvent::Sweep);
        assert!(r.voices().is_idle());
        assert!(r.message().unwrap().contains("repeats"));
    }

    #[test]
    fn valid_sweep_form_starts_a_repeated_sweep() {
        let mut r = router();
        r.handle(InputEvent::Sweep);
        let voice = r.voices().active_voice().unwrap();
        assert!(voice.kind.to_string().contains("sweep"));
        assert_eq!(r.message(), None);
    }

    #[test]
    fn stop_all_fades_any_voice() {
        let mut r = router();
        r.handle(InputEvent::Drop);
        r.handle(InputEvent::StopAll);
        assert!(r.voices().active_voice().unwrap().is_fading());
        run(&mut r, 0.3);
        assert!(r.voices().is_idle());
    }

    #[test]
    fn disabled_audio_ignores_play_events() {
        let mut r = router();
        r.disable_audio("no output device");
        r.disable_audio("second reason");
        assert_eq!(r.audio_error(), Some("no output device"));

        r.handle(InputEvent::KeyDown('a'));
        r.handle(InputEvent::Rise);
        r.handle(InputEvent::Sweep);
        assert!(r.voices().is_idle());
        assert!(r.message().unwrap().contains("no output device"));

        // Controls still respond.
        r.handle(InputEvent::Control(ControlEvent::CycleFilter));
        assert_ne!(r.controls().filter(), Default::default());
    }

    #[test]
    fn knob_plays_a_plain_sine_at_its_frequency() {
        let controls = ControlSurface::new()
            .with_waveform(Waveform::Square)
            .with_filter(FilterChoice::LowPass90);
        let mut r = router().with_controls(controls);
        for _ in 0..5 {
            r.handle(InputEvent::Control(ControlEvent::KnobUp));
        }
        r.handle(InputEvent::Knob);

        let voice = r.voices().active_voice().unwrap();
        assert_eq!(voice.kind, VoiceKind::Note { frequency: 30.0 });
        assert!(voice.nodes.filter.is_none());
        let osc = r.voices().backend().oscillator_info(voice.nodes.oscillator).unwrap();
        assert_eq!(osc.waveform, Waveform::Sine);

        run(&mut r, 8.9);
        assert!(!r.voices().active_voice().unwrap().is_fading());
        run(&mut r, 0.2);
        assert!(r.voices().active_voice().unwrap().is_fading());
    }

    #[test]
    fn reset_silences_and_restores_the_starting_controls() {
        let mut r = router().with_controls(ControlSurface::new().with_duration(0.5));
        r.handle(InputEvent::KeyDown('a'));
        r.handle(InputEvent::Control(ControlEvent::CycleWaveform));
        r.handle(InputEvent::Control(ControlEvent::KnobUp));
        r.handle(InputEvent::Control(ControlEvent::FocusPrev));
        r.handle(InputEvent::Control(ControlEvent::Input('0')));
        r.handle(InputEvent::Sweep);
        assert!(r.message().is_some());

        r.handle(InputEvent::Reset);
        assert!(r.voices().active_voice().unwrap().is_fading());
        assert!(!r.is_active('a'));
        assert_eq!(r.message(), None);

        let controls = r.controls();
        assert_eq!(controls.waveform(), Waveform::Sine);
        assert_eq!(controls.knob(), KNOB_MIN);
        assert_eq!(controls.focus(), Field::Duration);
        assert_eq!(controls.field(Field::Duration), "0.5");
        assert_eq!(controls.field(Field::Repeats), "4");

        // Held keys are forgotten too, so the next press plays.
        r.handle(InputEvent::KeyDown('a'));
        assert!(!r.voices().active_voice().unwrap().is_fading());
    }
}
