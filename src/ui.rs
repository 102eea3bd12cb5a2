pub mod keyboard_hint;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::App;
use touchmaster::Mode;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const KEYBOARD_HEIGHT: u16 = 5;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

/// How a lesson character is shown on screen
fn visible(c: char) -> String {
    match c {
        '\n' => "⏎".to_owned(),
        c => c.to_string(),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let engine = &self.engine;
        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);

        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);

        let underlined_bold_style = Style::default()
            .patch(bold_style)
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED);

        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let yellow_bold_style = Style::default().patch(bold_style).fg(Color::Yellow);

        let lesson = engine.current_lesson();
        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let prompt_width = lesson.text.width() as u16;
        let prompt_lines = prompt_width / max_chars_per_line + 1;

        let lower_height = if engine.is_completed() {
            3
        } else if self.show_keyboard {
            KEYBOARD_HEIGHT
        } else {
            0
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // mode / coins
                Constraint::Length(1), // lesson title
                Constraint::Min(1),
                Constraint::Length(prompt_lines),
                Constraint::Min(1),
                Constraint::Length(lower_height),
                Constraint::Length(1), // legend
            ])
            .split(area);

        // header
        let mode_label = match engine.mode() {
            Mode::Training => format!(
                "TRAINING MODULE {}/{}",
                lesson.id,
                engine.lesson_count()
            ),
            Mode::Story => format!("STORY MODE · {}", engine.theme_key().to_uppercase()),
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(mode_label, dim_bold_style),
            Span::raw("   "),
            Span::styled(format!("◎ {}", engine.coins()), yellow_bold_style),
        ]))
        .alignment(Alignment::Center);
        header.render(chunks[0], buf);

        let title_style = match engine.mode() {
            Mode::Training => Style::default().patch(bold_style).fg(Color::Cyan),
            Mode::Story => Style::default().patch(italic_style).fg(Color::Magenta),
        };
        let title = Paragraph::new(Span::styled(lesson.title.to_uppercase(), title_style))
            .alignment(Alignment::Center);
        title.render(chunks[1], buf);

        // prompt
        let mut spans = engine
            .typed_text()
            .chars()
            .map(|c| Span::styled(visible(c), green_bold_style))
            .collect::<Vec<Span>>();

        if let Some(next) = engine.next_expected_char() {
            let symbol = match next {
                ' ' => "␣".to_owned(),
                c => visible(c),
            };
            spans.push(Span::styled(
                symbol,
                if self.is_shaking() {
                    red_bold_style.add_modifier(Modifier::REVERSED)
                } else {
                    underlined_bold_style
                },
            ));
            spans.push(Span::styled(
                engine.remaining_text().chars().skip(1).map(visible).join(""),
                dim_bold_style,
            ));
        }

        let prompt = Paragraph::new(Line::from(spans))
            .alignment(if prompt_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false });
        prompt.render(chunks[3], buf);

        // results or keyboard
        if engine.is_completed() {
            let stats = engine.stats();
            let mut summary = vec![Span::styled(
                format!("{} wpm   {}% acc", stats.speed, stats.accuracy),
                bold_style,
            )];
            if let Some(best) = self.personal_best() {
                summary.push(Span::styled(format!("   best {best} wpm"), dim_bold_style));
            }
            let results = Paragraph::new(vec![
                Line::from(summary),
                Line::from(Span::styled(
                    format!(
                        "+{} speed bonus   +{} accuracy bonus",
                        stats.speed_bonus, stats.accuracy_bonus
                    ),
                    yellow_bold_style,
                )),
            ])
            .alignment(Alignment::Center);
            results.render(chunks[5], buf);
        } else if self.show_keyboard {
            keyboard_hint::KeyboardHint::new(engine.next_expected_char()).render(chunks[5], buf);
        }

        let legend_text = match (engine.is_completed(), engine.mode()) {
            (true, Mode::Story) => "(n)ext / (r)etry / (tab) theme / (esc)ape",
            (true, Mode::Training) => "(n)ext / (r)etry / (esc)ape",
            (false, Mode::Story) => "(←) restart / (→) skip / (tab) theme / (esc)ape",
            (false, Mode::Training) => "(←) restart / (→) skip / (esc)ape",
        };
        let legend = Paragraph::new(Span::styled(legend_text, italic_style))
            .alignment(Alignment::Center);
        legend.render(chunks[6], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchmaster::history::HistoryDb;
    use touchmaster::{MemoryStore, ProgressStore, TypingEngine};

    fn create_test_app(mode: Mode, show_keyboard: bool) -> App {
        let store: Box<dyn ProgressStore> = Box::new(MemoryStore::new());
        App::new(TypingEngine::new(mode, "cyber", store), show_keyboard)
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_visible_newline() {
        assert_eq!(visible('\n'), "⏎");
        assert_eq!(visible('ø'), "ø");
    }

    #[test]
    fn test_training_header_and_prompt() {
        let app = create_test_app(Mode::Training, false);
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("TRAINING MODULE 1/22"));
        assert!(text.contains("PEKEFINGRE"));
        assert!(text.contains("j f j j f j f"));
        assert!(text.contains("(esc)ape"));
    }

    #[test]
    fn test_story_header() {
        let app = create_test_app(Mode::Story, false);
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("STORY MODE"));
        assert!(text.contains("CYBER"));
        assert!(text.contains("(tab) theme"));
    }

    #[test]
    fn test_results_panel_after_completion() {
        let mut app = create_test_app(Mode::Story, true);
        for c in "init protocol zero".chars() {
            app.engine.submit_keystroke(&c.to_string());
        }
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains("100% acc"));
        assert!(text.contains("+50 accuracy bonus"));
        assert!(text.contains("(n)ext"));
    }

    #[test]
    fn test_results_show_personal_best() {
        let mut app = create_test_app(Mode::Story, true);
        let dir = tempfile::tempdir().unwrap();
        app.attach_history(HistoryDb::open(dir.path().join("progress.db")).unwrap());
        for c in "init protocol zero".chars() {
            app.engine.submit_keystroke(&c.to_string());
        }
        let best = app.personal_best().unwrap();
        let text = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(text.contains(&format!("best {best} wpm")));
    }

    #[test]
    fn test_extreme_sizes() {
        let app = create_test_app(Mode::Training, true);
        for area in [
            Rect::new(0, 0, 10, 5),
            Rect::new(0, 0, 80, 24),
            Rect::new(0, 0, 300, 100),
        ] {
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert!(*buffer.area() == area);
        }
    }
}
