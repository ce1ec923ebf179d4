use logwire_types::DownloadFormat;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,

    // UI toggles
    ToggleHelp,
    /// Close the help overlay or the current notification
    Dismiss,

    // Search input
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,

    // Filters
    ApplyFilter,
    ClearFilter,
    CycleLevelFilter,
    CycleCategoryFilter,

    // Log table
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,

    // Server operations
    RefreshLogs,
    RefreshStats,
    ClearServerLogs,
    Download(DownloadFormat),

    /// Drop buffered records and counters locally
    ClearView,

    // Render request
    Render,
}
