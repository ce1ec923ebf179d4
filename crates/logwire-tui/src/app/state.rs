use std::time::{Duration, Instant};

use logwire_logs::LogFilter;
use logwire_types::{Category, ConnectionState};

use super::notification::{NotificationKind, Notifications};

/// Level filter values, cycled in this order after "all"
pub const LEVEL_FILTERS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

/// UI-specific transient state
pub struct UiState {
    /// Is search bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Search text in effect (applied with Enter)
    pub applied_search: String,

    /// Level filter (None = all)
    pub level_filter: Option<String>,

    /// Category filter (None = all)
    pub category_filter: Option<Category>,

    /// Filter input error message
    pub filter_error: Option<String>,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Scroll position in the log table, counted from the newest record
    pub log_scroll: usize,

    /// Keep the newest records in view
    pub auto_scroll: bool,

    /// First press of the server clear, awaiting confirmation
    pub clear_armed_at: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            applied_search: String::new(),
            level_filter: None,
            category_filter: None,
            filter_error: None,
            help_visible: false,
            log_scroll: 0,
            auto_scroll: true,
            clear_armed_at: None,
        }
    }
}

/// Global application state
pub struct AppState {
    /// Server being viewed, for the header
    pub server: String,

    /// Last reported connection state
    pub connection: ConnectionState,

    /// Pending reconnect as (attempt, max attempts)
    pub reconnect: Option<(u32, u32)>,

    pub notifications: Notifications,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new(server: impl Into<String>, notification_lifetime: Duration) -> Self {
        Self {
            server: server.into(),
            connection: ConnectionState::Connecting,
            reconnect: None,
            notifications: Notifications::new(notification_lifetime),
            ui_state: UiState::default(),
            should_quit: false,
            render_dirty: true, // Start dirty to ensure initial render
        }
    }

    /// Record a connection state change
    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection = state;
        if state.is_open() || state.is_terminal() {
            self.reconnect = None;
        }
        self.render_dirty = true;
    }

    pub fn reconnect_scheduled(&mut self, attempt: u32, max_attempts: u32) {
        self.reconnect = Some((attempt, max_attempts));
        self.render_dirty = true;
    }

    /// Text for the connection-status indicator
    pub fn connection_label(&self) -> String {
        match self.reconnect {
            Some((attempt, max)) if !self.connection.is_open() => {
                format!("Reconnecting... ({attempt}/{max})")
            }
            _ => self.connection.label().to_string(),
        }
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifications.push(kind, message);
        self.render_dirty = true;
    }

    /// Guard for clearing server logs. The first press arms it and warns; a
    /// second press while the warning is still showing confirms.
    pub fn confirm_server_clear(&mut self, now: Instant) -> bool {
        let lifetime = self.notifications.lifetime();
        match self.ui_state.clear_armed_at.take() {
            Some(armed) if now.saturating_duration_since(armed) < lifetime => true,
            _ => {
                self.ui_state.clear_armed_at = Some(now);
                self.notifications.push_at(
                    NotificationKind::Warning,
                    "Press X again to delete all server logs",
                    now,
                );
                self.render_dirty = true;
                false
            }
        }
    }

    pub fn disarm_server_clear(&mut self) {
        self.ui_state.clear_armed_at = None;
    }

    /// Start search input mode, editing the applied search
    pub fn start_search(&mut self) {
        self.ui_state.search_active = true;
        self.ui_state.search_input = self.ui_state.applied_search.clone();
        self.ui_state.filter_error = None;
    }

    /// Leave search input without changing the applied search
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    /// Apply the search input. Returns the new filter on success.
    pub fn apply_search(&mut self) -> Option<LogFilter> {
        let previous = std::mem::replace(
            &mut self.ui_state.applied_search,
            self.ui_state.search_input.clone(),
        );
        match self.build_filter() {
            Ok(filter) => {
                self.ui_state.search_active = false;
                self.ui_state.filter_error = None;
                Some(filter)
            }
            Err(e) => {
                self.ui_state.applied_search = previous;
                self.ui_state.filter_error = Some(e);
                None
            }
        }
    }

    /// Reset search, level and category filters
    pub fn clear_filter(&mut self) -> LogFilter {
        self.ui_state.applied_search.clear();
        self.ui_state.search_input.clear();
        self.ui_state.level_filter = None;
        self.ui_state.category_filter = None;
        self.ui_state.filter_error = None;
        LogFilter::default()
    }

    /// Advance the level filter: all, DEBUG, INFO, WARNING, ERROR, all
    pub fn cycle_level_filter(&mut self) -> Result<LogFilter, String> {
        let next = match self.ui_state.level_filter.as_deref() {
            None => Some(LEVEL_FILTERS[0]),
            Some(current) => LEVEL_FILTERS
                .iter()
                .position(|l| l.eq_ignore_ascii_case(current))
                .and_then(|i| LEVEL_FILTERS.get(i + 1))
                .copied(),
        };
        self.ui_state.level_filter = next.map(str::to_string);
        self.build_filter()
    }

    pub fn cycle_category_filter(&mut self) -> Result<LogFilter, String> {
        self.ui_state.category_filter = Category::cycle(self.ui_state.category_filter);
        self.build_filter()
    }

    /// Compile the applied search and selectors into a filter
    pub fn build_filter(&self) -> Result<LogFilter, String> {
        let filter = LogFilter::new(&self.ui_state.applied_search)
            .map_err(|e| format!("Invalid search: {e}"))?;
        Ok(filter
            .with_level(self.ui_state.level_filter.as_deref())
            .with_category(self.ui_state.category_filter))
    }

    pub fn has_filter(&self) -> bool {
        !self.ui_state.applied_search.is_empty()
            || self.ui_state.level_filter.is_some()
            || self.ui_state.category_filter.is_some()
    }

    /// Add a character to search input
    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    /// Remove last character from search input
    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
        // Back at the newest record
        if self.ui_state.log_scroll == 0 {
            self.ui_state.auto_scroll = true;
        }
    }

    /// Keep a paused table on the same rows when a visible record lands on top
    pub fn record_arrived(&mut self, visible: bool) {
        if visible && !self.ui_state.auto_scroll {
            self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(1);
        }
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        // Don't cap here - render clamps to the visible count
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwire_types::LogRecord;

    fn state() -> AppState {
        AppState::new("http://127.0.0.1:8080", Duration::from_secs(3))
    }

    #[test]
    fn test_connection_label() {
        let mut state = state();
        assert_eq!(state.connection_label(), "Connecting...");

        state.set_connection_state(ConnectionState::Closed);
        state.reconnect_scheduled(2, 5);
        assert_eq!(state.connection_label(), "Reconnecting... (2/5)");

        state.set_connection_state(ConnectionState::Connecting);
        assert_eq!(state.connection_label(), "Reconnecting... (2/5)");

        state.set_connection_state(ConnectionState::Open);
        assert_eq!(state.connection_label(), "Connected");
        assert_eq!(state.reconnect, None);
    }

    #[test]
    fn test_server_clear_needs_second_press() {
        let mut state = state();
        let t0 = Instant::now();

        assert!(!state.confirm_server_clear(t0));
        assert!(state.ui_state.clear_armed_at.is_some());
        assert_eq!(state.notifications.iter().count(), 1);

        assert!(state.confirm_server_clear(t0 + Duration::from_secs(1)));
        assert_eq!(state.ui_state.clear_armed_at, None);

        // A fresh press after confirming arms again
        assert!(!state.confirm_server_clear(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_server_clear_arming_expires() {
        let mut state = state();
        let t0 = Instant::now();

        assert!(!state.confirm_server_clear(t0));
        // Too late: re-arms instead of confirming
        assert!(!state.confirm_server_clear(t0 + Duration::from_secs(4)));
        assert!(state.confirm_server_clear(t0 + Duration::from_secs(5)));

        assert!(!state.confirm_server_clear(t0 + Duration::from_secs(6)));
        state.disarm_server_clear();
        assert!(!state.confirm_server_clear(t0 + Duration::from_secs(7)));
    }

    #[test]
    fn test_paused_view_stays_anchored() {
        let mut state = state();

        // Following: the newest record stays on top
        state.record_arrived(true);
        assert_eq!(state.ui_state.log_scroll, 0);

        state.scroll_down(5);
        state.record_arrived(true);
        state.record_arrived(true);
        assert_eq!(state.ui_state.log_scroll, 7);

        // Filtered-out records do not move the rows
        state.record_arrived(false);
        assert_eq!(state.ui_state.log_scroll, 7);

        state.ui_state.log_scroll = 0;
        state.ui_state.auto_scroll = false;
        state.record_arrived(true);
        assert_eq!(state.ui_state.log_scroll, 1);
    }

    #[test]
    fn test_failed_clears_reconnect() {
        let mut state = state();
        state.reconnect_scheduled(5, 5);
        state.set_connection_state(ConnectionState::Failed);
        assert_eq!(state.connection_label(), "Connection failed");
    }

    #[test]
    fn test_apply_search() {
        let mut state = state();
        state.start_search();
        for c in "timeout".chars() {
            state.search_input_char(c);
        }
        let filter = state.apply_search().unwrap();

        assert!(!state.ui_state.search_active);
        assert_eq!(state.ui_state.applied_search, "timeout");
        assert!(filter.matches(&LogRecord::new("", "INFO", "Request TIMEOUT")));
        assert!(state.has_filter());

        // Reopening edits the applied text
        state.start_search();
        assert_eq!(state.ui_state.search_input, "timeout");
        state.cancel_search();
        assert_eq!(state.ui_state.applied_search, "timeout");
    }

    #[test]
    fn test_level_cycle() {
        let mut state = state();
        let seen: Vec<_> = (0..5)
            .map(|_| {
                state.cycle_level_filter().unwrap();
                state.ui_state.level_filter.clone()
            })
            .collect();

        assert_eq!(
            seen,
            vec![
                Some("DEBUG".to_string()),
                Some("INFO".to_string()),
                Some("WARNING".to_string()),
                Some("ERROR".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_filters_combine() {
        let mut state = state();
        state.cycle_category_filter().unwrap();
        state.cycle_category_filter().unwrap();
        assert_eq!(state.ui_state.category_filter, Some(Category::Database));

        state.ui_state.level_filter = Some("ERROR".to_string());
        let filter = state.build_filter().unwrap();
        assert!(filter.matches(&LogRecord::new("", "ERROR", "Database connection failed")));
        assert!(!filter.matches(&LogRecord::new("", "ERROR", "socket reset")));

        let cleared = state.clear_filter();
        assert!(cleared.is_empty());
        assert!(!state.has_filter());
    }

    #[test]
    fn test_scroll_follow() {
        let mut state = state();
        state.scroll_down(3);
        assert!(!state.ui_state.auto_scroll);
        state.scroll_up(10);
        assert_eq!(state.ui_state.log_scroll, 0);
        assert!(state.ui_state.auto_scroll);
    }
}
