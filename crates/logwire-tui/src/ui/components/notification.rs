use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::app::Notifications;
use crate::ui::{Layout, Theme};

/// Toasts in the top-right corner, oldest on top
pub struct NotificationToast;

impl NotificationToast {
    const MAX_WIDTH: u16 = 48;

    pub fn render(frame: &mut Frame, notifications: &Notifications) {
        let area = frame.area();

        for (i, notification) in notifications.iter().enumerate() {
            let width = (notification.message.width() as u16 + 4).clamp(20, Self::MAX_WIDTH);
            let Some(slot) = Layout::toast(area, i as u16, width) else {
                break;
            };

            let color = notification.kind.color();
            let toast = Paragraph::new(Span::styled(notification.message.as_str(), Theme::text()))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color))
                        .title(Span::styled(
                            notification.kind.title(),
                            Style::default().fg(color).add_modifier(Modifier::BOLD),
                        )),
                );

            frame.render_widget(Clear, slot);
            frame.render_widget(toast, slot);
        }
    }
}
