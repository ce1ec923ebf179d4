use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use logwire_types::ConnectionState;

use crate::connection::{Connection, ConnectionHandle, TransportEvent};
use crate::correlator::Correlator;
use crate::error::Result;
use crate::fallback::{Endpoints, FallbackFetcher};
use crate::policy::ReconnectConfig;
use crate::router::{MessageRouter, PushSink, Routed};
use crate::service::LogService;

/// Connection settings for a log server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `http(s)://host[:port]` or `ws(s)://host[:port]`
    pub server: String,
    pub reconnect: ReconnectConfig,
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:8080".to_string(),
            reconnect: ReconnectConfig::default(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Everything needed to talk to one server, built once at startup
pub struct LogClient {
    connection: ConnectionHandle,
    router: MessageRouter,
    service: LogService,
    endpoints: Endpoints,
}

impl LogClient {
    /// Resolve endpoints and start the streaming connection.
    ///
    /// Returns the client and the transport events the caller must drain,
    /// passing frames back through [`LogClient::route_frame`].
    pub fn connect(config: &ClientConfig) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        let endpoints = Endpoints::from_server(&config.server)?;
        let timeout = config.request_timeout();
        let fallback = FallbackFetcher::new(endpoints.clone(), timeout)?;

        info!(url = %endpoints.websocket, "connecting");
        let (connection, events) =
            Connection::open(endpoints.websocket.as_str(), config.reconnect.clone());

        let correlator = Correlator::new(connection.clone());
        let router = MessageRouter::new(correlator.clone());
        let service = LogService::new(correlator, fallback, timeout);

        Ok((
            Self {
                connection,
                router,
                service,
                endpoints,
            },
            events,
        ))
    }

    /// Dispatch one inbound frame to the correlator or the sink
    pub fn route_frame<S: PushSink + ?Sized>(&self, raw: &str, sink: &mut S) -> Routed {
        self.router.on_frame(raw, sink)
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Cheap handle for spawned request tasks
    pub fn service(&self) -> LogService {
        self.service.clone()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Close the connection and stop reconnecting
    pub fn shutdown(&self) {
        info!("closing connection");
        self.connection.close();
    }
}
