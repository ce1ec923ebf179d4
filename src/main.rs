mod config;

use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use logwire_client::{
    ClientError, ConnectionState, Download, LogClient, LogRecord, Routed, StatsSnapshot,
    TransportEvent,
};
use logwire_logs::ViewState;
use logwire_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    NotificationKind, NotificationToast, Tui,
};

use crate::config::Settings;

/// Logwire - A terminal viewer for live server logs
#[derive(Parser, Debug)]
#[command(name = "logwire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address, e.g. http://127.0.0.1:8080 (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,

    /// TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Diagnostics file [default: logwire.log in the temp directory]
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Records kept in the log table
    #[arg(long)]
    display_cap: Option<usize>,

    /// Stats refresh period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Directory for downloaded log files
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Where diagnostics go. Never the terminal, which the UI owns.
fn log_path(args: &Args) -> PathBuf {
    args.log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("logwire.log"))
}

fn init_tracing(args: &Args) -> Result<()> {
    let path = log_path(args);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(server) = &args.server {
        settings.server = server.clone();
    }
    if let Some(cap) = args.display_cap {
        settings.display_cap = cap;
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(ms) = args.request_timeout_ms {
        settings.request_timeout_ms = ms;
    }
    if let Some(dir) = &args.download_dir {
        settings.download_dir = dir.clone();
    }

    settings.validate()?;
    Ok(settings)
}

/// Results of spawned requests, fed back into the loop
enum InternalAction {
    LogsLoaded(Vec<LogRecord>),
    StatsLoaded(StatsSnapshot),
    ServerCleared,
    Downloaded(Download),
    Failed {
        operation: &'static str,
        error: ClientError,
        /// Background refreshes only log their failures
        quiet: bool,
    },
}

async fn run_app(args: Args) -> Result<()> {
    let settings = load_settings(&args)?;

    // Create action channels
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalAction>();

    // Start the connection before taking over the terminal so address errors print plainly
    let (client, mut transport_rx) = LogClient::connect(&settings.client_config())
        .with_context(|| format!("Cannot connect to {}", settings.server))?;
    info!(
        server = %settings.server,
        websocket = %client.endpoints().websocket,
        "viewer started"
    );

    // Initialize state
    let mut state = AppState::new(settings.server.clone(), settings.notification_lifetime());
    let mut view = ViewState::new(settings.display_cap);

    // Initialize TUI
    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    let mut stats_poll = tokio::time::interval(settings.poll_interval());
    stats_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Main event loop
    loop {
        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.search_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick => {
                        if state.notifications.expire(Instant::now()) {
                            state.render_dirty = true;
                        }
                    }
                    Event::Resize(_, _) => {
                        state.render_dirty = true;
                    }
                    Event::Error(e) => {
                        warn!(error = %e, "terminal input error");
                        state.notify(NotificationKind::Error, e);
                    }
                }
            }

            // Handle transport events in arrival order
            Some(transport) = transport_rx.recv() => {
                handle_transport(&mut state, &mut view, &client, &settings, &internal_tx, transport);
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut view, &client, &settings, &internal_tx, action);
            }

            // Handle finished requests
            Some(internal) = internal_rx.recv() => {
                handle_internal(&mut state, &mut view, &settings, internal);
            }

            // Periodic stats refresh; polls may overlap
            _ = stats_poll.tick() => {
                let service = client.service();
                spawn_request(
                    &internal_tx,
                    "refresh stats",
                    true,
                    async move { service.fetch_stats().await },
                    InternalAction::StatsLoaded,
                );
            }
        }

        if state.should_quit {
            break;
        }

        if state.render_dirty {
            render(&mut tui, &mut state, &view)?;
            state.render_dirty = false;
        }
    }

    // Cleanup
    client.shutdown();
    events.shutdown().await;
    tui.restore()?;

    Ok(())
}

/// Run a request on its own task and report the outcome to the loop
fn spawn_request<T, Fut>(
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
    operation: &'static str,
    quiet: bool,
    request: Fut,
    done: fn(T) -> InternalAction,
) where
    T: Send + 'static,
    Fut: Future<Output = logwire_client::Result<T>> + Send + 'static,
{
    let internal_tx = internal_tx.clone();
    tokio::spawn(async move {
        let message = match request.await {
            Ok(value) => done(value),
            Err(error) => InternalAction::Failed {
                operation,
                error,
                quiet,
            },
        };
        let _ = internal_tx.send(message);
    });
}

/// Pull a fresh table, narrowed to the level filter when one is set
fn request_logs(
    state: &AppState,
    client: &LogClient,
    settings: &Settings,
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
) {
    let service = client.service();
    match state.ui_state.level_filter.clone() {
        Some(level) => spawn_request(
            internal_tx,
            "load logs",
            false,
            async move { service.fetch_logs_by_level(&level).await },
            InternalAction::LogsLoaded,
        ),
        None => {
            let limit = settings.snapshot_limit;
            spawn_request(
                internal_tx,
                "load logs",
                false,
                async move { service.fetch_logs(limit, 0).await },
                InternalAction::LogsLoaded,
            )
        }
    }
}

fn handle_transport(
    state: &mut AppState,
    view: &mut ViewState,
    client: &LogClient,
    settings: &Settings,
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
    event: TransportEvent,
) {
    match event {
        TransportEvent::Frame(raw) => {
            let routed = client.route_frame(&raw, view);
            if routed == Routed::Log {
                state.record_arrived(view.newest_is_visible());
            }
            if routed.touched_view() {
                state.render_dirty = true;
            }
        }
        TransportEvent::StateChanged(connection) => {
            let was_open = state.connection.is_open();
            state.set_connection_state(connection);
            match connection {
                ConnectionState::Open => {
                    state.notify(NotificationKind::Success, "Connected");
                    request_logs(state, client, settings, internal_tx);
                }
                ConnectionState::Closed | ConnectionState::Errored if was_open => {
                    state.notify(NotificationKind::Warning, "Connection lost");
                }
                ConnectionState::Failed => {
                    state.notify(
                        NotificationKind::Error,
                        "Live updates unavailable, using HTTP",
                    );
                    request_logs(state, client, settings, internal_tx);
                }
                _ => {}
            }
        }
        TransportEvent::ReconnectScheduled {
            attempt,
            max_attempts,
            delay,
        } => {
            debug!(attempt, max_attempts, ?delay, "reconnect pending");
            state.reconnect_scheduled(attempt, max_attempts);
        }
    }
}

fn handle_internal(
    state: &mut AppState,
    view: &mut ViewState,
    settings: &Settings,
    internal: InternalAction,
) {
    state.render_dirty = true;
    match internal {
        InternalAction::LogsLoaded(records) => {
            let count = records.len();
            view.replace_with_snapshot(records);
            state.ui_state.log_scroll = 0;
            state.notify(NotificationKind::Info, format!("Loaded {count} logs"));
        }
        InternalAction::StatsLoaded(snapshot) => {
            view.ingest_stats_snapshot(snapshot);
        }
        InternalAction::ServerCleared => {
            view.clear();
            state.notify(NotificationKind::Success, "Server logs cleared");
        }
        InternalAction::Downloaded(download) => match save_download(settings, &download) {
            Ok(path) => {
                info!(path = %path.display(), bytes = download.bytes.len(), "download saved");
                state.notify(
                    NotificationKind::Success,
                    format!("Saved {}", path.display()),
                );
            }
            Err(e) => {
                warn!(error = %e, "saving download failed");
                state.notify(NotificationKind::Error, format!("{e:#}"));
            }
        },
        InternalAction::Failed {
            operation,
            error,
            quiet,
        } => {
            warn!(operation, error = %error, "request failed");
            if !quiet {
                state.notify(
                    NotificationKind::Error,
                    format!("Failed to {operation}: {error}"),
                );
            }
        }
    }
}

fn handle_action(
    state: &mut AppState,
    view: &mut ViewState,
    client: &LogClient,
    settings: &Settings,
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
    action: Action,
) {
    state.render_dirty = true;
    if action != Action::ClearServerLogs {
        state.disarm_server_clear();
    }
    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }
        Action::Dismiss => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
            } else {
                state.notifications.dismiss();
            }
        }

        // Filter/Search actions
        Action::OpenSearch => {
            state.start_search();
        }
        Action::CloseSearch => {
            state.cancel_search();
        }
        Action::SearchInput(c) => {
            state.search_input_char(c);
        }
        Action::SearchBackspace => {
            state.search_input_backspace();
        }
        Action::SearchClear => {
            state.ui_state.search_input.clear();
        }
        Action::ApplyFilter => {
            if let Some(filter) = state.apply_search() {
                view.set_filter(filter);
                state.ui_state.log_scroll = 0;
            }
        }
        Action::ClearFilter => {
            view.set_filter(state.clear_filter());
        }
        Action::CycleLevelFilter => match state.cycle_level_filter() {
            Ok(filter) => view.set_filter(filter),
            Err(e) => state.ui_state.filter_error = Some(e),
        },
        Action::CycleCategoryFilter => match state.cycle_category_filter() {
            Ok(filter) => view.set_filter(filter),
            Err(e) => state.ui_state.filter_error = Some(e),
        },

        // Log table actions
        Action::ScrollUp(n) => {
            state.scroll_up(n);
        }
        Action::ScrollDown(n) => {
            state.scroll_down(n);
        }
        Action::PageUp => {
            state.scroll_up(20);
        }
        Action::PageDown => {
            state.scroll_down(20);
        }
        Action::ScrollToTop => {
            state.ui_state.log_scroll = 0;
            state.ui_state.auto_scroll = true;
        }
        Action::ScrollToBottom => {
            state.ui_state.auto_scroll = false;
            // Render clamps to the actual bottom
            state.ui_state.log_scroll = usize::MAX;
        }
        Action::ToggleAutoScroll => {
            state.ui_state.auto_scroll = !state.ui_state.auto_scroll;
        }
        Action::ClearView => {
            view.clear();
            state.ui_state.log_scroll = 0;
            state.notify(NotificationKind::Info, "View cleared");
        }

        // Server operations
        Action::RefreshLogs => {
            request_logs(state, client, settings, internal_tx);
        }
        Action::RefreshStats => {
            let service = client.service();
            spawn_request(
                internal_tx,
                "refresh stats",
                false,
                async move { service.fetch_stats().await },
                InternalAction::StatsLoaded,
            );
        }
        Action::ClearServerLogs => {
            if !state.confirm_server_clear(Instant::now()) {
                return;
            }
            let service = client.service();
            spawn_request(
                internal_tx,
                "clear server logs",
                false,
                async move { service.clear_logs().await },
                |()| InternalAction::ServerCleared,
            );
        }
        Action::Download(format) => {
            state.notify(
                NotificationKind::Info,
                format!("Downloading {} logs...", format.as_str()),
            );
            let service = client.service();
            spawn_request(
                internal_tx,
                "download logs",
                false,
                async move { service.download_logs(format).await },
                InternalAction::Downloaded,
            );
        }

        Action::Render => {}
    }
}

fn save_download(settings: &Settings, download: &Download) -> Result<PathBuf> {
    let name = download.file_name(chrono::Local::now().date_naive());
    let path = settings.download_dir.join(name);
    std::fs::write(&path, &download.bytes)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(path)
}

fn render(tui: &mut Tui, state: &mut AppState, view: &ViewState) -> Result<()> {
    tui.draw(|frame| {
        LogViewerScreen::render(frame, state, view);

        if !state.notifications.is_empty() {
            NotificationToast::render(frame, &state.notifications);
        }

        // Render help overlay if visible
        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    Ok(())
}
