//! Terminal front end: reads crossterm events, feeds them to the
//! [`InputRouter`] and draws the keyboard, controls and scope.

mod keyboard;
mod panel;
mod waveform;

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Layout},
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use tracing::info;

use lowkeys::{
    graph::SharedGraph,
    input::{ControlEvent, InputEvent, InputRouter},
};

use keyboard::{render_keyboard, KeyAreas, KEYBOARD_HEIGHT};
use panel::{render_message, render_panel, render_status, AudioStats, PANEL_HEIGHT};
use waveform::render_waveform;

/// Samples kept for the oscilloscope
const VIS_BUFFER_SIZE: usize = 4096;

pub struct UiApp {
    router: InputRouter<SharedGraph>,
    scope: Consumer<f32>,
    audio_buffer: Vec<f32>,
    sample_rate: Option<f32>,
    key_areas: KeyAreas,
    /// Visual key the mouse went down on and is still over.
    hovered: Option<char>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(router: InputRouter<SharedGraph>, scope: Consumer<f32>, sample_rate: Option<f32>) -> Self {
        Self {
            router,
            scope,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            sample_rate,
            key_areas: KeyAreas::default(),
            hovered: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.router.tick();

            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        // Let the current voice fade rather than cut off mid-cycle.
        self.router.handle(InputEvent::StopAll);
        info!("quit");
        Ok(())
    }

    fn poll_audio(&mut self) {
        let mut fresh = 0;
        while let Ok(sample) = self.scope.pop() {
            self.audio_buffer.push(sample);
            fresh += 1;
        }
        if fresh > 0 && self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }
        if ctrl {
            return;
        }

        if key.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = key.code {
                if c.is_ascii_alphabetic() {
                    self.router.handle(InputEvent::KeyUp(c));
                }
            }
            return;
        }

        let event = match key.code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => InputEvent::KeyDown(c),
            // Everything below reacts to the first press only.
            _ if key.kind == KeyEventKind::Repeat => return,
            KeyCode::Char(' ') => InputEvent::StopAll,
            KeyCode::Char('[') => InputEvent::Drop,
            KeyCode::Char(']') => InputEvent::Rise,
            KeyCode::Enter => InputEvent::Sweep,
            KeyCode::Char(c) => InputEvent::Control(ControlEvent::Input(c)),
            KeyCode::Backspace => InputEvent::Control(ControlEvent::Backspace),
            KeyCode::Tab | KeyCode::Down => InputEvent::Control(ControlEvent::FocusNext),
            KeyCode::BackTab | KeyCode::Up => InputEvent::Control(ControlEvent::FocusPrev),
            KeyCode::F(2) => InputEvent::Control(ControlEvent::CycleWaveform),
            KeyCode::F(3) => InputEvent::Control(ControlEvent::CycleFilter),
            KeyCode::Right => InputEvent::Control(ControlEvent::SweepDurationUp),
            KeyCode::Left => InputEvent::Control(ControlEvent::SweepDurationDown),
            KeyCode::PageUp => return self.turn_knob(ControlEvent::KnobUp),
            KeyCode::PageDown => return self.turn_knob(ControlEvent::KnobDown),
            KeyCode::F(5) => InputEvent::Reset,
            _ => return,
        };
        self.router.handle(event);
    }

    /// Move the knob one step and play its new frequency.
    fn turn_knob(&mut self, step: ControlEvent) {
        self.router.handle(InputEvent::Control(step));
        self.router.handle(InputEvent::Knob);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let under = self.key_areas.key_at(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(key) = under {
                    self.hovered = Some(key);
                    self.router.handle(InputEvent::MouseDown(key));
                }
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                if let Some(key) = self.hovered.filter(|&k| under != Some(k)) {
                    self.hovered = None;
                    self.router.handle(InputEvent::MouseLeave(key));
                }
            }
            MouseEventKind::Up(_) => self.hovered = None,
            _ => {}
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let [status, keys, controls, scope, message] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(KEYBOARD_HEIGHT),
            Constraint::Length(PANEL_HEIGHT),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let voice = self.router.voices().active_voice();
        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_status(frame, status, voice.as_ref(), self.sample_rate, &stats);

        let router = &self.router;
        self.key_areas = render_keyboard(frame, keys, router.keymap(), |k| router.is_active(k));

        render_panel(frame, controls, router.controls());
        render_waveform(frame, scope, &self.audio_buffer, "Scope");
        render_message(frame, message, router.message());
    }
}
