//! Application state and actions

mod action;
mod notification;
mod state;

pub use action::Action;
pub use notification::{Notification, NotificationKind, Notifications};
pub use state::{AppState, LEVEL_FILTERS, UiState};
