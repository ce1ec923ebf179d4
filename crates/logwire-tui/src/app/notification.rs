use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::style::Color;

/// Severity of a transient message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Success => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Info => " Info ",
            Self::Success => " Done ",
            Self::Warning => " Warning ",
            Self::Error => " Error ",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub shown_at: Instant,
}

/// Queue of transient messages, each dismissed after a fixed lifetime
#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notification>,
    lifetime: Duration,
}

impl Notifications {
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3);

    pub fn new(lifetime: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            lifetime,
        }
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.push_at(kind, message, Instant::now());
    }

    pub fn push_at(&mut self, kind: NotificationKind, message: impl Into<String>, now: Instant) {
        self.items.push_back(Notification {
            kind,
            message: message.into(),
            shown_at: now,
        });
    }

    /// Drop expired notifications. Returns true if any were removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items
            .retain(|n| now.saturating_duration_since(n.shown_at) < self.lifetime);
        self.items.len() != before
    }

    /// Dismiss the oldest visible notification
    pub fn dismiss(&mut self) -> bool {
        self.items.pop_front().is_some()
    }

    /// Notifications to show, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIFETIME)
    }
}
