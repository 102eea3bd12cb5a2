use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use touchmaster::keyboard::{is_key_active, layout, needs_shift, Key};

/// On-screen keyboard with the next key lit up
pub struct KeyboardHint {
    target: Option<char>,
}

impl KeyboardHint {
    pub fn new(target: Option<char>) -> Self {
        Self { target }
    }

    fn key_span(&self, key: Key) -> Span<'static> {
        let active = match (key, self.target) {
            (Key::Shift, Some(t)) => needs_shift(t),
            (key, Some(t)) => is_key_active(key, t),
            (_, None) => false,
        };

        let label = match key {
            Key::Char(_) => format!("[{}]", key.label()),
            _ => {
                let inner = (key.width() * 3).saturating_sub(2) as usize;
                format!("[{:^inner$}]", key.label())
            }
        };

        let style = if active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };

        Span::styled(label, style)
    }
}

impl Widget for KeyboardHint {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = layout()
            .into_iter()
            .map(|row| Line::from(row.into_iter().map(|k| self.key_span(k)).collect::<Vec<_>>()))
            .collect::<Vec<_>>();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}
