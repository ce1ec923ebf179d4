use chrono::Local;
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use logwire_logs::{LogFilter, LogRecord, ViewState};

use crate::app::AppState;
use crate::ui::components::{StatusBar, log_viewer_hints};
use crate::ui::{Layout, Theme};

const TIME_WIDTH: usize = 8;
const LEVEL_WIDTH: usize = 7;
const CATEGORY_WIDTH: usize = 8;

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, view: &ViewState) {
        let show_filter_bar = state.ui_state.search_active
            || state.has_filter()
            || state.ui_state.filter_error.is_some();
        let (header, filter_bar, logs, status) = Layout::log_viewer(frame.area(), show_filter_bar);

        Self::render_header(frame, header, state, view);
        if let Some(area) = filter_bar {
            Self::render_filter_bar(frame, area, state);
        }
        Self::render_logs(frame, logs, state, view);
        Self::render_status_bar(frame, status, state, view);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState, view: &ViewState) {
        let counters = view.counters();
        let status_color = if state.reconnect.is_some() && !state.connection.is_open() {
            Color::Yellow
        } else {
            state.connection.color()
        };

        let mut spans = vec![
            Span::styled("logwire", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.server.as_str(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("● ", Style::default().fg(status_color)),
            Span::styled(
                state.connection_label(),
                Style::default().fg(status_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("Total:", Theme::text_dim()),
            Span::styled(format!("{} ", counters.total), Theme::text()),
            Span::styled("ERR:", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(format!("{} ", counters.error), Theme::text()),
            Span::styled("WRN:", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(format!("{} ", counters.warning), Theme::text()),
            Span::styled("INF:", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}", counters.info), Theme::text()),
        ];

        if let Some(clients) = view.client_count() {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(format!("{clients} clients"), Theme::text()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let ui = &state.ui_state;
        let mut spans = vec![];

        if ui.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(ui.search_input.as_str(), Theme::text_highlight()));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        } else {
            spans.push(Span::styled(" Search: ", Theme::text_dim()));
            let search = if ui.applied_search.is_empty() {
                "-"
            } else {
                ui.applied_search.as_str()
            };
            spans.push(Span::styled(search, Theme::text_highlight()));
        }

        spans.push(Span::styled("  Level: ", Theme::text_dim()));
        spans.push(Span::styled(
            ui.level_filter.as_deref().unwrap_or("all"),
            Theme::text(),
        ));
        spans.push(Span::styled("  Type: ", Theme::text_dim()));
        spans.push(Span::styled(
            ui.category_filter.map(|c| c.as_str()).unwrap_or("all"),
            Theme::text(),
        ));

        if let Some(err) = &ui.filter_error {
            spans.push(Span::styled(" ", Theme::text()));
            spans.push(Span::styled(format!("⚠ {err}"), Style::default().fg(Color::Red)));
        }

        if ui.search_active {
            spans.push(Span::styled("  [Enter] Apply  [Esc] Cancel", Theme::text_dim()));
        } else {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let border = if ui.search_active {
            Theme::border_focused()
        } else if ui.filter_error.is_some() {
            Style::default().fg(Color::Red)
        } else {
            Theme::border()
        };
        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(" Filter ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, view: &ViewState) {
        let total_visible = view.visible_count();
        let inner_height = area.height.saturating_sub(2) as usize;

        // Newest records are at the top, so following means staying there
        if state.ui_state.auto_scroll {
            state.ui_state.log_scroll = 0;
        }
        let max_scroll = total_visible.saturating_sub(inner_height);
        if state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }

        // Borders and scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;
        let filter = view.filter();
        let lines: Vec<Line> = view
            .visible()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|entry| Self::format_row(&entry.record, filter, inner_width))
            .collect();

        let title = if filter.is_empty() {
            format!(" Logs ({}) ", view.len())
        } else {
            format!(" Logs ({} of {}) ", total_visible, view.len())
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(logs_widget, area);

        if total_visible > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// One table row: time, level, message, category
    fn format_row(record: &LogRecord, filter: &LogFilter, width: usize) -> Line<'static> {
        let bucket = record.severity();
        let category = record.category();

        let time = record
            .parsed_timestamp()
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| truncate_to_width(&record.timestamp, TIME_WIDTH).to_string());
        let level = truncate_to_width(&record.level, LEVEL_WIDTH).to_uppercase();

        let fixed = TIME_WIDTH + 1 + LEVEL_WIDTH + 1 + 1 + CATEGORY_WIDTH;
        let message_width = width.saturating_sub(fixed);
        let message = truncate_to_width(&record.message, message_width);
        let padding = message_width.saturating_sub(message.width());

        let mut spans = vec![
            Span::styled(format!("{time:<TIME_WIDTH$} "), Theme::text_dim()),
            Span::styled(format!("{level:<LEVEL_WIDTH$} "), Theme::level(bucket)),
        ];
        spans.extend(highlight(message, filter, Theme::message(bucket)));
        spans.push(Span::raw(" ".repeat(padding + 1)));
        spans.push(Span::styled(
            format!("{:>CATEGORY_WIDTH$}", category.as_str()),
            Theme::category(category),
        ));

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, view: &ViewState) {
        let follow = if state.ui_state.auto_scroll {
            "▲ follow"
        } else {
            "paused"
        };
        let right = format!("{}/{} shown │ {}", view.visible_count(), view.cap(), follow);

        let status = StatusBar::new().hints(log_viewer_hints()).right(right);
        frame.render_widget(status, area);
    }
}

/// Longest prefix of `s` that fits in `max` columns
fn truncate_to_width(s: &str, max: usize) -> &str {
    let mut used = 0;
    for (i, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > max {
            return &s[..i];
        }
        used += w;
    }
    s
}

/// Split text into spans, marking search matches
fn highlight(text: &str, filter: &LogFilter, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    for (start, end) in filter.find_matches(text) {
        if start > pos {
            spans.push(Span::styled(text[pos..start].to_string(), base));
        }
        spans.push(Span::styled(text[start..end].to_string(), Theme::search_match()));
        pos = end;
    }
    if pos < text.len() {
        spans.push(Span::styled(text[pos..].to_string(), base));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwire_types::ConnectionState;
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};
    use std::time::Duration;

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (area.y..area.y + area.height)
            .map(|y| {
                (area.x..area.x + area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello", 3), "hel");
        // Wide characters take two columns
        assert_eq!(truncate_to_width("日本語", 5), "日本");
    }

    #[test]
    fn test_highlight_marks_matches() {
        let filter = LogFilter::new("fail").unwrap();
        let spans = highlight("Login failed", &filter, Theme::text());
        let parts: Vec<_> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["Login ", "fail", "ed"]);
        assert_eq!(spans[1].style, Theme::search_match());
    }

    #[test]
    fn test_render_table_and_header() {
        let mut state = AppState::new("http://127.0.0.1:8080", Duration::from_secs(3));
        state.set_connection_state(ConnectionState::Open);

        let mut view = ViewState::default();
        view.ingest_log(LogRecord::new(
            "2024-05-01 12:00:00",
            "ERROR",
            "Database connection failed",
        ));
        view.ingest_log(LogRecord::new("2024-05-01 12:00:01", "INFO", "User login ok"));

        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &view))
            .unwrap();
        let text = buffer_text(terminal.backend().buffer());

        assert!(text.contains("Connected"));
        assert!(text.contains("ERR:1"));
        assert!(text.contains("Logs (2)"));
        assert!(text.contains("Database connection failed"));
        assert!(text.contains("database"));

        // Newest record is the first row
        let newest = text.find("User login ok").unwrap();
        let oldest = text.find("Database connection failed").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn test_render_filtered_title() {
        let mut state = AppState::new("http://127.0.0.1:8080", Duration::from_secs(3));
        state.ui_state.level_filter = Some("ERROR".to_string());

        let mut view = ViewState::default();
        view.ingest_log(LogRecord::new("", "ERROR", "disk failure"));
        view.ingest_log(LogRecord::new("", "INFO", "heartbeat"));
        view.set_filter(state.build_filter().unwrap());

        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &view))
            .unwrap();
        let text = buffer_text(terminal.backend().buffer());

        assert!(text.contains("Logs (1 of 2)"));
        assert!(text.contains("Level: ERROR"));
        assert!(!text.contains("heartbeat"));
    }
}
