mod help_overlay;
mod notification;
mod status_bar;

pub use help_overlay::HelpOverlay;
pub use notification::NotificationToast;
pub use status_bar::{StatusBar, log_viewer_hints};
