use serde_json::Value;
use tracing::debug;

use logwire_types::{LogRecord, StatsSnapshot};

use crate::correlator::Correlator;
use crate::protocol::InboundFrame;

/// Consumer of unsolicited server events
pub trait PushSink {
    fn ingest_log(&mut self, record: LogRecord);
    fn ingest_stats_snapshot(&mut self, snapshot: StatsSnapshot);
}

/// What happened to an inbound frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    /// Settled a pending request
    Resolved(u64),
    /// Response for an id with no pending entry; dropped
    Unmatched(u64),
    /// Log record handed to the sink
    Log,
    /// Stats snapshot handed to the sink
    Stats,
    /// Well-formed frame of a kind we do not handle; dropped
    Ignored(Option<String>),
    /// Not valid JSON or not a valid frame; dropped
    Malformed,
}

impl Routed {
    /// Whether the sink changed and the view needs a redraw
    pub fn touched_view(&self) -> bool {
        matches!(self, Self::Log | Self::Stats)
    }
}

/// Classifies inbound frames and dispatches them
#[derive(Clone)]
pub struct MessageRouter {
    correlator: Correlator,
}

impl MessageRouter {
    pub fn new(correlator: Correlator) -> Self {
        Self { correlator }
    }

    /// Route one raw frame. Never fails: bad frames are logged and dropped.
    pub fn on_frame<S: PushSink + ?Sized>(&self, raw: &str, sink: &mut S) -> Routed {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, len = raw.len(), "dropping unparseable frame");
                return Routed::Malformed;
            }
        };
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let frame = match serde_json::from_value::<InboundFrame>(value) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, kind = ?kind, "dropping malformed frame");
                return Routed::Malformed;
            }
        };

        match frame {
            InboundFrame::Response(response) => {
                let id = response.request_id;
                if self.correlator.resolve(response) {
                    Routed::Resolved(id)
                } else {
                    debug!(id, "dropping response with no pending request");
                    Routed::Unmatched(id)
                }
            }
            InboundFrame::LogUpdate(record) => {
                sink.ingest_log(record);
                Routed::Log
            }
            InboundFrame::StatsUpdate(snapshot) => {
                sink.ingest_stats_snapshot(snapshot);
                Routed::Stats
            }
            InboundFrame::Unknown => {
                debug!(kind = ?kind, "ignoring unrecognized frame");
                Routed::Ignored(kind)
            }
        }
    }
}
