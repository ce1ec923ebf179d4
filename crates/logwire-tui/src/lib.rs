//! TUI components for logwire
//!
//! This crate provides the terminal user interface for logwire,
//! including state management, keybindings, event handling, and UI components.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Notification, NotificationKind, Notifications, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, NotificationToast, StatusBar};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
