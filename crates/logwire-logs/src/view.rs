use std::collections::VecDeque;

use tracing::debug;

use logwire_client::PushSink;
use logwire_types::{LogRecord, StatsSnapshot};

use crate::counters::SeverityCounters;
use crate::filter::LogFilter;

/// Records kept for display unless configured otherwise
pub const DEFAULT_DISPLAY_CAP: usize = 1000;

/// A buffered record and whether the active filter lets it through
#[derive(Clone, Debug)]
pub struct ViewEntry {
    /// Arrival sequence number, unique within this view
    pub id: u64,
    pub record: LogRecord,
    pub visible: bool,
}

/// Client-side state fed by pushed and pulled records
#[derive(Debug)]
pub struct ViewState {
    /// Newest first
    entries: VecDeque<ViewEntry>,

    /// Maximum number of buffered records
    cap: usize,

    next_id: u64,
    counters: SeverityCounters,
    client_count: Option<u64>,
    filter: LogFilter,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_CAP)
    }
}

impl ViewState {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
            next_id: 0,
            counters: SeverityCounters::default(),
            client_count: None,
            filter: LogFilter::default(),
        }
    }

    /// Add a record at the front, evicting the oldest beyond the cap.
    ///
    /// Only the new record is evaluated against the filter.
    pub fn ingest_log(&mut self, record: LogRecord) {
        self.counters.record(&record);

        let visible = self.filter.matches(&record);
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(ViewEntry {
            id,
            record,
            visible,
        });
        if self.entries.len() > self.cap {
            self.entries.pop_back();
        }
    }

    /// Overwrite counters with the fields the server sent
    pub fn ingest_stats_snapshot(&mut self, snapshot: StatsSnapshot) {
        self.counters.apply_snapshot(&snapshot);
        if let Some(clients) = snapshot.client_count {
            self.client_count = Some(clients);
        }
    }

    /// Replace the predicate and re-evaluate every buffered record
    pub fn set_filter(&mut self, filter: LogFilter) {
        debug!(?filter, "filter changed");
        self.filter = filter;
        for entry in self.entries.iter_mut() {
            entry.visible = self.filter.matches(&entry.record);
        }
    }

    /// Replace buffer and counters with a pulled snapshot (newest first)
    pub fn replace_with_snapshot(&mut self, records: Vec<LogRecord>) {
        debug!(count = records.len(), "replacing view with snapshot");
        self.entries.clear();
        self.counters = SeverityCounters::default();
        for record in records.into_iter().rev() {
            self.ingest_log(record);
        }
    }

    /// Drop buffered records and counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counters = SeverityCounters::default();
    }

    /// Entries passing the filter, newest first
    pub fn visible(&self) -> impl Iterator<Item = &ViewEntry> {
        self.entries.iter().filter(|e| e.visible)
    }

    pub fn visible_records(&self) -> Vec<&LogRecord> {
        self.visible().map(|e| &e.record).collect()
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.visible).count()
    }

    /// Whether the most recently ingested record passed the filter
    pub fn newest_is_visible(&self) -> bool {
        self.entries.front().is_some_and(|e| e.visible)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn counters(&self) -> &SeverityCounters {
        &self.counters
    }

    /// Last connected-client count reported by the server
    pub fn client_count(&self) -> Option<u64> {
        self.client_count
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }
}

impl PushSink for ViewState {
    fn ingest_log(&mut self, record: LogRecord) {
        ViewState::ingest_log(self, record);
    }

    fn ingest_stats_snapshot(&mut self, snapshot: StatsSnapshot) {
        ViewState::ingest_stats_snapshot(self, snapshot);
    }
}
