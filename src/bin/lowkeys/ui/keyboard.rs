//! On-screen keyboard, laid out like the letter rows it is played from.

use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use lowkeys::input::{note_name, Keymap};

/// Top to bottom, highest notes first.
const ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

pub const KEYBOARD_HEIGHT: u16 = 4 * ROWS.len() as u16 + 2;

/// Screen area of every key drawn in the last frame, for mouse hit-testing.
#[derive(Debug, Default)]
pub struct KeyAreas(Vec<(char, Rect)>);

impl KeyAreas {
    pub fn key_at(&self, column: u16, row: u16) -> Option<char> {
        let pos = Position::new(column, row);
        self.0
            .iter()
            .find(|(_, rect)| rect.contains(pos))
            .map(|(key, _)| *key)
    }
}

/// Lay the keys out inside `area`. Each row is left-aligned with the same
/// key width so the rows stagger like a real keyboard.
pub fn layout_keys(area: Rect) -> KeyAreas {
    let widest = ROWS.iter().map(|r| r.len()).max().unwrap_or(1) as u16;
    let key_width = (area.width / widest).max(1);
    let rows = Layout::vertical([Constraint::Length(4); ROWS.len()]).split(area);

    let mut keys = Vec::with_capacity(26);
    for (row_idx, (letters, row)) in ROWS.iter().zip(rows.iter()).enumerate() {
        // Offset each lower row by a third of a key.
        let indent = key_width * row_idx as u16 / 3;
        for (i, key) in letters.chars().enumerate() {
            let x = row.x + indent + key_width * i as u16;
            if x + key_width > area.right() {
                break;
            }
            keys.push((key, Rect::new(x, row.y, key_width, row.height)));
        }
    }
    KeyAreas(keys)
}

pub fn render_keyboard(
    frame: &mut Frame,
    area: Rect,
    keymap: &Keymap,
    is_active: impl Fn(char) -> bool,
) -> KeyAreas {
    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let keys = layout_keys(inner);
    for &(key, rect) in &keys.0 {
        let Some(binding) = keymap.binding(key) else {
            continue;
        };
        let name = note_name(binding.note);
        let sharp = name.contains('#');

        let style = if is_active(key) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightCyan)
                .add_modifier(Modifier::BOLD)
        } else if sharp {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Black).bg(Color::Gray)
        };

        let text = vec![
            Line::from(key.to_ascii_uppercase().to_string()),
            Line::from(name),
        ];
        let widget = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(widget, rect);
    }
    keys
}
