use tracing::{debug, trace, warn};

use super::{
    controls::ControlSnapshot,
    error::VoiceError,
    voice::{
        validate_duration, validate_frequency, SweepSpec, Voice, VoiceId, VoiceInfo, VoiceKind,
        VoiceNodes, VoicePhase,
    },
};
use crate::{
    dsp::{filter::FilterKind, Waveform},
    engine::Scheduler,
    graph::{AudioBackend, GraphError, NodeId, Param, Target},
};

/*
Voice Lifecycle
===============

The controller owns at most one voice. Every transition goes through here:

              play_*                 stop() / auto-stop
    (none) ──────────▶ Sounding ───────────────────────▶ Fading
       ▲                  │                                │
       │   last segment   │                                │ teardown timer
       └──────────────────┘◀───────────────────────────────┘
              finished         nodes disconnected, reference cleared

Any play_* while a voice exists (sounding or fading) supersedes it first:
its timers are cancelled and its gain ramps from wherever it is to zero over
SUPERSEDE_RAMP, with the oscillator stopped at the end of the ramp. The new
voice starts exactly there, so the old one is silent before the new one
makes a sound. A teardown timer at the same instant disconnects the old
nodes.

Fading
------

stop() reads the gain's value at `now` rather than assuming 1.0, holds it,
and ramps to zero over FADE_OUT. A second stop() while fading is a no-op;
the teardown timer already in flight finishes the job. The teardown task
carries the voice id and the node ids it must release, so a late timer can
only ever touch its own nodes.

Repeated sweeps
---------------

Each segment is a fresh oscillator/gain pair (oscillators are single-shot)
that sweeps start → end → start and stops itself at the segment end. When
the backend reports that oscillator finished, the next segment is scheduled
to start at the previous segment's scheduled end, so segments abut on the
audio clock. After the last segment the voice simply ends.
*/

/// Fade-out window applied by `stop()`, in seconds.
pub const FADE_OUT: f64 = 0.2;

/// Ramp-out given to a superseded voice, in seconds. The next voice starts
/// when it ends.
pub const SUPERSEDE_RAMP: f64 = 0.005;

#[derive(Debug)]
enum VoiceTask {
    AutoStop(VoiceId),
    Teardown { voice: VoiceId, nodes: VoiceNodes },
}

pub struct VoiceController<B: AudioBackend> {
    backend: B,
    timers: Scheduler<VoiceTask>,
    voice: Option<Voice>,
    next_voice: u64,
}

impl<B: AudioBackend> VoiceController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            timers: Scheduler::new(),
            voice: None,
            next_voice: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn now(&self) -> f64 {
        self.backend.now()
    }

    pub fn active_voice(&self) -> Option<VoiceInfo> {
        self.voice.as_ref().map(Voice::info)
    }

    pub fn is_idle(&self) -> bool {
        self.voice.is_none()
    }

    /// Timers (auto-stops and teardowns) not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Play `frequency` with the waveform, filter and duration in `controls`.
    ///
    /// The note stops itself (with the usual fade) after `controls.duration`.
    pub fn play_note(
        &mut self,
        frequency: f32,
        controls: &ControlSnapshot,
    ) -> Result<VoiceId, VoiceError> {
        let frequency = validate_frequency(frequency)?;
        let duration = validate_duration(controls.duration)?;

        let start = self.supersede();
        let nodes = self.spawn(
            controls.waveform,
            controls.filter.cutoff(),
            frequency,
            start,
            |_, _| Ok(()),
        )?;

        let id = self.install(nodes, VoiceKind::Note { frequency }, Some(start + duration));
        debug!(voice = %id, frequency, waveform = %controls.waveform, filter = %controls.filter, duration, "note on");
        Ok(id)
    }

    /// Sweep linearly from `start` to `end` Hz over `duration` seconds, then stop.
    pub fn play_sweep(&mut self, start: f32, end: f32, duration: f64) -> Result<VoiceId, VoiceError> {
        let spec = SweepSpec::new(start, end, duration, 1)?;

        let start_at = self.supersede();
        let until = start_at + spec.duration();
        let nodes = self.spawn(Waveform::Sine, None, spec.start(), start_at, |backend, nodes| {
            backend.linear_ramp_to(Param::Frequency(nodes.oscillator), spec.end(), until)
        })?;

        let id = self.install(
            nodes,
            VoiceKind::Sweep {
                start: spec.start(),
                end: spec.end(),
            },
            Some(until),
        );
        debug!(voice = %id, start, end, duration, "sweep");
        Ok(id)
    }

    /// Play `repeats` back-to-back up-down sweeps, each `duration` seconds
    /// long: `start` → `end` over the first half, back to `start` over the
    /// second. Rejects `repeats` outside `1..=10`.
    pub fn play_repeated_sweep(
        &mut self,
        start: f32,
        end: f32,
        duration: f64,
        repeats: u32,
    ) -> Result<VoiceId, VoiceError> {
        let spec = SweepSpec::new(start, end, duration, repeats)?;

        let start_at = self.supersede();
        let nodes = self.spawn_segment(&spec, start_at)?;

        let id = self.install(
            nodes,
            VoiceKind::RepeatedSweep {
                spec,
                segment: 0,
                segment_end: start_at + spec.duration(),
            },
            None,
        );
        debug!(voice = %id, start, end, duration, repeats, "repeated sweep");
        Ok(id)
    }

    /// Fade the active voice out over [`FADE_OUT`] and release it.
    ///
    /// Returns `false` without doing anything when there is no voice or the
    /// voice is already fading.
    pub fn stop(&mut self) -> bool {
        let Some(voice) = self.voice.as_mut() else {
            return false;
        };
        if let VoicePhase::Fading { .. } = voice.phase {
            trace!(voice = %voice.id, "stop ignored, already fading");
            return false;
        }

        if let Some(timer) = voice.auto_stop.take() {
            self.timers.cancel(timer);
        }

        let now = self.backend.now();
        let until = now + FADE_OUT;
        if let Err(err) = fade_out(&mut self.backend, &voice.nodes, now, until) {
            warn!(voice = %voice.id, %err, "fade-out rejected, releasing immediately");
            let nodes = voice.nodes;
            self.voice = None;
            release(&mut self.backend, &nodes);
            return true;
        }

        let teardown = self.timers.schedule(
            until,
            VoiceTask::Teardown {
                voice: voice.id,
                nodes: voice.nodes,
            },
        );
        voice.phase = VoicePhase::Fading { teardown, until };
        debug!(voice = %voice.id, until, "fading out");
        true
    }

    /// Run due timers and react to finished oscillators. Call regularly.
    pub fn tick(&mut self) {
        let now = self.backend.now();
        for (_, task) in self.timers.drain_due(now) {
            match task {
                VoiceTask::AutoStop(id) => {
                    if self.current_id() == Some(id) {
                        trace!(voice = %id, "auto-stop");
                        self.stop();
                    }
                }
                VoiceTask::Teardown { voice, nodes } => {
                    release(&mut self.backend, &nodes);
                    if self.current_id() == Some(voice) {
                        self.voice = None;
                        debug!(%voice, "released");
                    }
                }
            }
        }

        for oscillator in self.backend.take_finished() {
            self.on_finished(oscillator);
        }
    }

    fn current_id(&self) -> Option<VoiceId> {
        self.voice.as_ref().map(|v| v.id)
    }

    fn on_finished(&mut self, oscillator: NodeId) {
        let Some(voice) = self.voice.as_ref() else {
            return;
        };
        if voice.nodes.oscillator != oscillator || voice.phase != VoicePhase::Sounding {
            trace!(node = %oscillator, "finished oscillator is not the sounding segment");
            return;
        }
        let VoiceKind::RepeatedSweep {
            spec,
            segment,
            segment_end,
        } = voice.kind
        else {
            return;
        };
        let (id, finished) = (voice.id, voice.nodes);

        release(&mut self.backend, &finished);

        let next = segment + 1;
        if next >= spec.repeats() {
            self.voice = None;
            debug!(voice = %id, repeats = spec.repeats(), "repeated sweep complete");
            return;
        }

        match self.spawn_segment(&spec, segment_end) {
            Ok(nodes) => {
                if let Some(voice) = self.voice.as_mut() {
                    voice.nodes = nodes;
                    voice.kind = VoiceKind::RepeatedSweep {
                        spec,
                        segment: next,
                        segment_end: segment_end + spec.duration(),
                    };
                }
                trace!(voice = %id, segment = next, "next sweep segment");
            }
            Err(err) => {
                warn!(voice = %id, %err, "could not chain sweep segment");
                self.voice = None;
            }
        }
    }

    /// Ramp the current voice out over [`SUPERSEDE_RAMP`] and hand its nodes
    /// to a teardown timer. Returns the time the next voice may start.
    fn supersede(&mut self) -> f64 {
        let now = self.backend.now();
        let Some(voice) = self.voice.take() else {
            return now;
        };

        if let Some(timer) = voice.auto_stop {
            self.timers.cancel(timer);
        }
        if let VoicePhase::Fading { teardown, .. } = voice.phase {
            self.timers.cancel(teardown);
        }

        let until = now + SUPERSEDE_RAMP;
        if let Err(err) = fade_out(&mut self.backend, &voice.nodes, now, until) {
            trace!(voice = %voice.id, %err, "ramp-out rejected, releasing now");
            release(&mut self.backend, &voice.nodes);
            return now;
        }
        self.timers.schedule(
            until,
            VoiceTask::Teardown {
                voice: voice.id,
                nodes: voice.nodes,
            },
        );
        debug!(voice = %voice.id, until, "superseded");
        until
    }

    fn install(&mut self, nodes: VoiceNodes, kind: VoiceKind, auto_stop_at: Option<f64>) -> VoiceId {
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;

        let auto_stop = auto_stop_at.map(|at| self.timers.schedule(at, VoiceTask::AutoStop(id)));
        self.voice = Some(Voice {
            id,
            nodes,
            kind,
            auto_stop,
            phase: VoicePhase::Sounding,
        });
        id
    }

    fn spawn_segment(&mut self, spec: &SweepSpec, start: f64) -> Result<VoiceNodes, VoiceError> {
        let turnaround = start + spec.duration() / 2.0;
        let end = start + spec.duration();
        let spec = *spec;

        self.spawn(Waveform::Sine, None, spec.start(), start, |backend, nodes| {
            let frequency = Param::Frequency(nodes.oscillator);
            backend.linear_ramp_to(frequency, spec.end(), turnaround)?;
            backend.linear_ramp_to(frequency, spec.start(), end)?;
            backend.stop(nodes.oscillator, end)
        })
    }

    /// Create and wire a voice's nodes, starting at `start`, then run
    /// `schedule` for any extra automation. On failure every node created
    /// here is disconnected again.
    fn spawn(
        &mut self,
        waveform: Waveform,
        cutoff: Option<f32>,
        frequency: f32,
        start: f64,
        schedule: impl FnOnce(&mut B, &VoiceNodes) -> Result<(), GraphError>,
    ) -> Result<VoiceNodes, VoiceError> {
        let nodes = VoiceNodes {
            oscillator: self.backend.create_oscillator(waveform, frequency),
            gain: self.backend.create_gain(1.0),
            filter: cutoff.map(|hz| self.backend.create_filter(FilterKind::LowPass, hz)),
        };

        let wired = wire(&mut self.backend, &nodes, frequency, start)
            .and_then(|()| schedule(&mut self.backend, &nodes));
        if let Err(err) = wired {
            warn!(%err, "voice setup failed, releasing partial voice");
            release(&mut self.backend, &nodes);
            return Err(err.into());
        }
        Ok(nodes)
    }
}

/// Route osc → [filter →] gain → output and start the oscillator.
///
/// Routing is exclusive: with a filter the oscillator reaches the gain only
/// through it.
fn wire<B: AudioBackend>(
    backend: &mut B,
    nodes: &VoiceNodes,
    frequency: f32,
    start: f64,
) -> Result<(), GraphError> {
    match nodes.filter {
        Some(filter) => {
            backend.connect(nodes.oscillator, Target::Node(filter))?;
            backend.connect(filter, Target::Node(nodes.gain))?;
        }
        None => backend.connect(nodes.oscillator, Target::Node(nodes.gain))?,
    }
    backend.connect(nodes.gain, Target::Output)?;

    backend.set_value_at(Param::Frequency(nodes.oscillator), frequency, start)?;
    backend.set_value_at(Param::Gain(nodes.gain), 1.0, start)?;
    backend.start(nodes.oscillator, start)
}

fn fade_out<B: AudioBackend>(
    backend: &mut B,
    nodes: &VoiceNodes,
    now: f64,
    until: f64,
) -> Result<(), GraphError> {
    let gain = Param::Gain(nodes.gain);
    let current = backend.param_value(gain, now)?;
    backend.cancel_scheduled(gain, now)?;
    backend.set_value_at(gain, current, now)?;
    backend.linear_ramp_to(gain, 0.0, until)?;
    backend.stop(nodes.oscillator, until)
}

fn release<B: AudioBackend>(backend: &mut B, nodes: &VoiceNodes) {
    for node in nodes.iter() {
        if let Err(err) = backend.disconnect(node) {
            warn!(%node, %err, "disconnect failed");
        }
    }
}
