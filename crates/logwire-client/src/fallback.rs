//! HTTP data path used when the streaming connection is unavailable

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use logwire_types::{Download, DownloadFormat, LogRecord, StatsSnapshot};

use crate::error::{ClientError, Result};

/// Resolved server addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Base for the HTTP API (`http(s)://host[:port]`)
    pub http_base: Url,

    /// Streaming endpoint (`ws(s)://host[:port]/ws`)
    pub websocket: Url,
}

impl Endpoints {
    /// Derive both endpoints from a server address.
    ///
    /// Accepts `http`, `https`, `ws` or `wss`; the secure schemes pair up.
    pub fn from_server(server: &str) -> Result<Self> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: server.to_string(),
            reason,
        };

        let parsed = Url::parse(server).map_err(|e| invalid(e.to_string()))?;
        let (http_scheme, ws_scheme) = match parsed.scheme() {
            "http" | "ws" => ("http", "ws"),
            "https" | "wss" => ("https", "wss"),
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        };

        let mut http_base = parsed.clone();
        http_base
            .set_scheme(http_scheme)
            .map_err(|_| invalid("cannot use as http base".to_string()))?;
        http_base.set_path("/");
        http_base.set_query(None);

        let mut websocket = parsed;
        websocket
            .set_scheme(ws_scheme)
            .map_err(|_| invalid("cannot use as websocket url".to_string()))?;
        websocket.set_path("/ws");
        websocket.set_query(None);

        Ok(Self {
            http_base,
            websocket,
        })
    }

    fn api(&self, path: &str) -> Url {
        let mut url = self.http_base.clone();
        url.set_path(path);
        url
    }

    /// `GET /api/logs` with the optional query parameters that are set
    pub fn logs_url(&self, limit: Option<usize>, offset: Option<usize>, level: Option<&str>) -> Url {
        let mut url = self.api("/api/logs");
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = offset {
                query.append_pair("offset", &offset.to_string());
            }
            if let Some(level) = level {
                query.append_pair("level", level);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        url
    }

    pub fn stats_url(&self) -> Url {
        self.api("/api/stats")
    }

    pub fn download_url(&self, format: DownloadFormat) -> Url {
        let mut url = self.api("/api/download-log");
        url.query_pairs_mut().append_pair("type", format.as_str());
        url
    }
}

/// One-reply-per-call HTTP client mirroring the request kinds
#[derive(Clone)]
pub struct FallbackFetcher {
    http: reqwest::Client,
    endpoints: Endpoints,
    timeout: Duration,
}

impl FallbackFetcher {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoints,
            timeout,
        })
    }

    pub async fn fetch_logs(&self, limit: usize, offset: usize) -> Result<Vec<LogRecord>> {
        self.get_json(self.endpoints.logs_url(Some(limit), Some(offset), None))
            .await
    }

    pub async fn fetch_stats(&self) -> Result<StatsSnapshot> {
        self.get_json(self.endpoints.stats_url()).await
    }

    pub async fn clear_logs(&self) -> Result<()> {
        let url = self.endpoints.logs_url(None, None, None);
        debug!(%url, "DELETE");
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.http_error(e, "clear_logs"))?;
        check_status(response.status())
    }

    pub async fn fetch_logs_by_level(&self, level: &str) -> Result<Vec<LogRecord>> {
        self.get_json(self.endpoints.logs_url(None, None, Some(level)))
            .await
    }

    pub async fn download_logs(&self, format: DownloadFormat) -> Result<Download> {
        let url = self.endpoints.download_url(format);
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.http_error(e, "download_logs"))?;
        check_status(response.status())?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(format.default_content_type())
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.http_error(e, "download_logs"))?;

        Ok(Download {
            format,
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let context = url.path().to_string();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.http_error(e, &context))?;
        check_status(response.status())?;

        response
            .json::<T>()
            .await
            .map_err(|e| self.http_error(e, &context))
    }

    fn http_error(&self, e: reqwest::Error, context: &str) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
                context: context.to_string(),
            }
        } else if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::Application(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        )))
    }
}
