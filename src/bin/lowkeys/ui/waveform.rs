//! Oscilloscope. Sub-bass periods are long, so the trace is aligned on a
//! rising zero crossing to keep it from drifting across the screen.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Index of the first rising zero crossing in the older half of `samples`,
/// or 0 when there is none (silence, DC).
fn trigger_point(samples: &[f32]) -> usize {
    let half = samples.len() / 2;
    samples[..half.max(1).min(samples.len())]
        .windows(2)
        .position(|w| w[0] <= 0.0 && w[1] > 0.0)
        .map(|i| i + 1)
        .unwrap_or(0)
}

pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32], title: &str) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL);

    let start = trigger_point(samples);
    let window = samples.len() / 2;
    let visible = &samples[start..(start + window).min(samples.len())];

    let data: Vec<(f64, f64)> = visible
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / window.max(1) as f64, s as f64))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::LightGreen))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-1.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
