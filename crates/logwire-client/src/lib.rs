//! Server client for logwire
//!
//! This crate provides the reconnecting streaming connection, request/response
//! correlation over it, and the HTTP fallback used while it is down.

mod client;
mod connection;
mod correlator;
mod error;
mod fallback;
mod policy;
mod protocol;
mod router;
mod service;

pub use client::{ClientConfig, LogClient};
pub use connection::{Connection, ConnectionHandle, TransportEvent};
pub use correlator::{Correlator, PendingRequest};
pub use error::{ClientError, Result};
pub use fallback::{Endpoints, FallbackFetcher};
pub use policy::{ReconnectConfig, ReconnectPolicy};
pub use protocol::{DownloadPayload, InboundFrame, RequestFrame, ResponseFrame};
pub use router::{MessageRouter, PushSink, Routed};
pub use service::LogService;

// Re-export types used in our public API
pub use logwire_types::{
    ConnectionState, Download, DownloadFormat, LogRecord, RequestKind, StatsSnapshot,
};
