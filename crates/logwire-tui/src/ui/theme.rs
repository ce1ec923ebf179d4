use ratatui::style::{Color, Modifier, Style};

use logwire_types::{Category, SeverityBucket};

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Border styles
    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    // Text styles
    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Search match inside a message
    pub fn search_match() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG_DIM).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    /// Level column; unknown levels are dim
    pub fn level(bucket: Option<SeverityBucket>) -> Style {
        match bucket {
            Some(b) => Style::default().fg(b.color()).add_modifier(Modifier::BOLD),
            None => Self::text_dim(),
        }
    }

    /// Message text, tinted for warnings and errors
    pub fn message(bucket: Option<SeverityBucket>) -> Style {
        match bucket {
            Some(SeverityBucket::Error) => Style::default().fg(Color::Red),
            Some(SeverityBucket::Warning) => Style::default().fg(Color::Yellow),
            _ => Self::text(),
        }
    }

    pub fn category(category: Category) -> Style {
        let color = match category {
            Category::Auth => Color::Magenta,
            Category::Database => Color::Blue,
            Category::Network => Color::Cyan,
            Category::System => Color::LightGreen,
            Category::Other => Self::FG_DIM,
        };
        Style::default().fg(color)
    }
}
