use logwire_types::{LogRecord, SeverityBucket, StatsSnapshot};

/// Running counts per severity bucket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounters {
    pub total: u64,
    pub debug: u64,
    pub info: u64,
    pub warning: u64,
    pub error: u64,
}

impl SeverityCounters {
    /// Count one record. Levels without a bucket only move the total.
    pub fn record(&mut self, record: &LogRecord) {
        self.total += 1;
        match record.severity() {
            Some(SeverityBucket::Debug) => self.debug += 1,
            Some(SeverityBucket::Info) => self.info += 1,
            Some(SeverityBucket::Warning) => self.warning += 1,
            Some(SeverityBucket::Error) => self.error += 1,
            None => {}
        }
    }

    /// Overwrite with the fields present in a server snapshot
    pub fn apply_snapshot(&mut self, snapshot: &StatsSnapshot) {
        if let Some(total) = snapshot.total_logs {
            self.total = total;
        }
        if let Some(debug) = snapshot.debug_count {
            self.debug = debug;
        }
        if let Some(info) = snapshot.info_count {
            self.info = info;
        }
        if let Some(warning) = snapshot.warning_count {
            self.warning = warning;
        }
        if let Some(error) = snapshot.error_count {
            self.error = error;
        }
    }

    pub fn get(&self, bucket: SeverityBucket) -> u64 {
        match bucket {
            SeverityBucket::Debug => self.debug,
            SeverityBucket::Info => self.info,
            SeverityBucket::Warning => self.warning,
            SeverityBucket::Error => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucketing() {
        let mut counters = SeverityCounters::default();
        for level in ["INFO", "warn", "WARNING", "Error", "FATAL", "debug", "TRACE"] {
            counters.record(&LogRecord::new("", level, "x"));
        }

        assert_eq!(counters.total, 7);
        assert_eq!(counters.info, 1);
        assert_eq!(counters.warning, 2);
        assert_eq!(counters.error, 2);
        assert_eq!(counters.debug, 1);
        assert_eq!(counters.get(SeverityBucket::Warning), 2);
    }

    #[test]
    fn test_snapshot_leaves_absent_fields() {
        let mut counters = SeverityCounters {
            total: 10,
            debug: 1,
            info: 5,
            warning: 3,
            error: 1,
        };
        counters.apply_snapshot(&StatsSnapshot {
            total_logs: Some(40),
            error_count: Some(7),
            ..StatsSnapshot::default()
        });

        assert_eq!(counters.total, 40);
        assert_eq!(counters.error, 7);
        assert_eq!(counters.info, 5);
        assert_eq!(counters.warning, 3);
    }
}
