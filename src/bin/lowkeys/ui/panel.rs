//! Control panel and status bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, LineGauge, Paragraph},
    Frame,
};

use lowkeys::{
    input::{
        surface::{KNOB_MAX, KNOB_MIN, SWEEP_DURATION_MAX, SWEEP_DURATION_MIN},
        ControlSurface, Field,
    },
    synth::VoiceInfo,
};

pub const PANEL_HEIGHT: u16 = 6;

/// Peak and RMS of the scope buffer
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_panel(frame: &mut Frame, area: Rect, controls: &ControlSurface) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [fields_area, right_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(inner);

    let fields: Vec<Line> = Field::ALL
        .iter()
        .map(|&field| {
            let focused = controls.focus() == field;
            let value_style = if focused {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::White)
            };
            let cursor = if focused { "▏" } else { "" };
            Line::from(vec![
                Span::styled(
                    format!("{:>18}: ", field.label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{}{cursor}", controls.field(field)), value_style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(fields), fields_area);

    let [choices_area, slider_area, knob_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(right_area);

    let choices = vec![
        Line::from(vec![
            Span::styled("waveform ", Style::default().fg(Color::DarkGray)),
            Span::styled(controls.waveform().to_string(), Style::default().fg(Color::Cyan)),
            Span::styled("  [F2]", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled("  filter ", Style::default().fg(Color::DarkGray)),
            Span::styled(controls.filter().to_string(), Style::default().fg(Color::Cyan)),
            Span::styled("  [F3]", Style::default().fg(Color::DarkGray)),
        ]),
    ];
    frame.render_widget(Paragraph::new(choices), choices_area);

    let ratio = (controls.sweep_duration() - SWEEP_DURATION_MIN)
        / (SWEEP_DURATION_MAX - SWEEP_DURATION_MIN);
    let slider = LineGauge::default()
        .filled_style(Style::default().fg(Color::Magenta))
        .unfilled_style(Style::default().fg(Color::DarkGray))
        .line_set(symbols::line::THICK)
        .label(format!("sweep {} [←/→]", controls.sweep_duration_label()))
        .ratio(ratio.clamp(0.0, 1.0));
    frame.render_widget(slider, slider_area);

    let knob = LineGauge::default()
        .filled_style(Style::default().fg(Color::Green))
        .unfilled_style(Style::default().fg(Color::DarkGray))
        .line_set(symbols::line::THICK)
        .label(format!("knob {} [PgUp/PgDn]", controls.knob_label()))
        .ratio(knob_ratio(controls.knob()));
    frame.render_widget(knob, knob_area);
}

fn knob_ratio(hz: u32) -> f64 {
    let span = (KNOB_MAX - KNOB_MIN) as f64;
    (hz.saturating_sub(KNOB_MIN) as f64 / span).clamp(0.0, 1.0)
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    voice: Option<&VoiceInfo>,
    sample_rate: Option<f32>,
    stats: &AudioStats,
) {
    let block = Block::default()
        .title(" lowkeys ")
        .borders(Borders::ALL);

    let (voice_text, voice_color) = match voice {
        None => ("idle".to_string(), Color::DarkGray),
        Some(v) if v.is_fading() => (format!("{} (fading)", v.kind), Color::Yellow),
        Some(v) => (v.kind.to_string(), Color::Green),
    };
    let rate = match sample_rate {
        Some(hz) => format!("{:.1}kHz  ", hz / 1000.0),
        None => "no audio  ".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {voice_text}  "), Style::default().fg(voice_color)),
        Span::styled(rate, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_message(frame: &mut Frame, area: Rect, message: Option<&str>) {
    let line = match message {
        Some(text) => Line::from(Span::styled(
            format!(" {text}"),
            Style::default().fg(Color::LightRed),
        )),
        None => Line::from(Span::styled(
            " [a-z] Play  [Space] Stop  [[] Drop  []] Rise  [Enter] Sweep  [Tab] Field  [F5] Reset  [Esc] Quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_a_square_wave() {
        let stats = AudioStats::from_buffer(&[0.5, -0.5, 0.5, -0.5]);
        assert_eq!(stats.peak, 0.5);
        assert!((stats.rms - 0.5).abs() < 1e-6);
        assert_eq!(AudioStats::from_buffer(&[]).peak, 0.0);
    }

    #[test]
    fn knob_gauge_spans_its_range() {
        assert_eq!(knob_ratio(KNOB_MIN), 0.0);
        assert_eq!(knob_ratio(KNOB_MAX), 1.0);
        assert!((knob_ratio(40) - 0.5).abs() < 1e-9);
    }
}
