use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Split the log viewer into header, optional filter bar, table and status bar
    pub fn log_viewer(area: Rect, show_filter_bar: bool) -> (Rect, Option<Rect>, Rect, Rect) {
        let mut constraints = vec![Constraint::Length(3)]; // Header
        if show_filter_bar {
            constraints.push(Constraint::Length(3)); // Filter bar
        }
        constraints.push(Constraint::Min(1)); // Logs
        constraints.push(Constraint::Length(1)); // Status bar

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        if show_filter_bar {
            (chunks[0], Some(chunks[1]), chunks[2], chunks[3])
        } else {
            (chunks[0], None, chunks[1], chunks[2])
        }
    }

    /// Centered popup of at most the given size
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }

    /// Stacked toast slot in the top-right corner, below the header
    pub fn toast(area: Rect, index: u16, width: u16) -> Option<Rect> {
        const HEIGHT: u16 = 3;
        let width = width.min(area.width.saturating_sub(2));
        let y = area.y + 3 + index * HEIGHT;
        if width == 0 || y + HEIGHT > area.y + area.height.saturating_sub(1) {
            return None;
        }
        let x = area.x + area.width.saturating_sub(width + 1);
        Some(Rect::new(x, y, width, HEIGHT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_viewer_split() {
        let area = Rect::new(0, 0, 80, 24);
        let (header, filter, logs, status) = Layout::log_viewer(area, true);
        assert_eq!(header.height, 3);
        assert_eq!(filter.map(|r| r.height), Some(3));
        assert_eq!(logs.height, 17);
        assert_eq!(status.y, 23);

        let (_, filter, logs, _) = Layout::log_viewer(area, false);
        assert!(filter.is_none());
        assert_eq!(logs.height, 20);
    }

    #[test]
    fn test_toast_slots_stop_at_bottom() {
        let area = Rect::new(0, 0, 80, 12);
        assert_eq!(Layout::toast(area, 0, 40), Some(Rect::new(39, 3, 40, 3)));
        assert_eq!(Layout::toast(area, 1, 40), Some(Rect::new(39, 6, 40, 3)));
        assert_eq!(Layout::toast(area, 2, 40), None);
    }
}
