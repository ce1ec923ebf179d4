use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::Layout;

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let popup_area = Layout::centered(frame.area(), 50, 30);

        // Clear the background
        frame.render_widget(Clear, popup_area);

        let help_text = vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Self::section("Navigation"),
            Self::key_line("j/↓", "Older"),
            Self::key_line("k/↑", "Newer"),
            Self::key_line("Ctrl+d", "Page down"),
            Self::key_line("Ctrl+u", "Page up"),
            Self::key_line("g", "Newest"),
            Self::key_line("G", "Oldest"),
            Self::key_line("f", "Toggle follow mode"),
            Line::from(""),
            Self::section("Filters"),
            Self::key_line("/", "Search messages"),
            Self::key_line("l", "Cycle level filter"),
            Self::key_line("t", "Cycle type filter"),
            Self::key_line("n", "Clear filters"),
            Line::from(""),
            Self::section("Server"),
            Self::key_line("r", "Reload logs"),
            Self::key_line("s", "Refresh stats"),
            Self::key_line("d", "Download HTML"),
            Self::key_line("D", "Download text"),
            Self::key_line("X X", "Clear server logs"),
            Self::key_line("c", "Clear local view"),
            Line::from(""),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("Esc", "Close / dismiss"),
            Self::key_line("q", "Quit"),
        ];

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    " Help ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn section(title: &str) -> Line<'_> {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    }

    fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {:>8}", key), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::White)),
        ])
    }
}
