/*
Parameter Automation
====================

Every schedulable parameter in the graph (oscillator frequency, gain,
filter cutoff) is an `Automation`: a default value plus a time-ordered list
of events on the audio clock.

  SetValue   { time, value }   jump to `value` at `time`
  LinearRamp { time, value }   arrive at `value` at `time`, moving in a
                               straight line from the previous event

  value
    1.0 ┤━━━━━━━━━━━┓                      set(1.0, t0)
        │           ┃╲                     set(1.0, t1)   <- hold
        │           ┃  ╲                   ramp(0.0, t2)  <- fade
    0.0 ┤           ┃    ╲━━━━━━━
        └──t0───────t1────t2──────→ time

Evaluation at time t looks at the last event at or before t (the anchor).
If the event right after the anchor is a ramp, the value is interpolated
between the anchor and the ramp's target. Otherwise the anchor value holds.
Before any event the default holds.

Cancelling drops every event at or after a time. The usual "fade from
wherever we are" recipe is therefore:

    let current = param.value_at(now);
    param.cancel_from(now);
    param.set_value_at(current, now);
    param.linear_ramp_to(0.0, now + fade);

which never jumps, even if an earlier fade was still in flight.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    SetValue { time: f64, value: f32 },
    LinearRamp { time: f64, value: f32 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } | ParamEvent::LinearRamp { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValue { value, .. } | ParamEvent::LinearRamp { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Automation {
    default: f32,
    events: Vec<ParamEvent>,
}

impl Automation {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::with_capacity(8),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent::SetValue { time, value });
    }

    pub fn linear_ramp_to(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent::LinearRamp { time, value });
    }

    /// Remove every event scheduled at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    // Events at the same time keep their insertion order.
    fn insert(&mut self, event: ParamEvent) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let after = self.events.partition_point(|e| e.time() <= time);
        let Some(anchor) = after.checked_sub(1).map(|i| self.events[i]) else {
            return self.default;
        };

        match self.events.get(after) {
            Some(&ParamEvent::LinearRamp {
                time: end,
                value: target,
            }) => {
                let start = anchor.time();
                let span = end - start;
                if span <= 0.0 {
                    return target;
                }
                let progress = ((time - start) / span) as f32;
                anchor.value() + (target - anchor.value()) * progress
            }
            _ => anchor.value(),
        }
    }

    /// Fill `out` with per-sample values starting at `start`.
    pub fn fill(&self, out: &mut [f32], start: f64, sample_rate: f32) {
        let dt = 1.0 / sample_rate as f64;
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.value_at(start + i as f64 * dt);
        }
    }

    /// Drop events that can no longer influence values at or after `time`.
    pub fn retire_before(&mut self, time: f64) {
        let after = self.events.partition_point(|e| e.time() <= time);
        if after > 1 {
            self.events.drain(..after - 1);
        }
    }
}
