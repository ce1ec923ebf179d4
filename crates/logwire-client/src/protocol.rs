//! JSON frames exchanged over the streaming endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use logwire_types::{LogRecord, RequestKind, StatsSnapshot};

use crate::error::{ClientError, Result};

/// Outbound request frame
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
    #[serde(rename = "type")]
    frame_type: &'static str,
    pub request_type: RequestKind,
    pub request_id: u64,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl RequestFrame {
    pub fn new(request_type: RequestKind, request_id: u64, data: Value) -> Self {
        Self {
            frame_type: "request",
            request_type,
            request_id,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ClientError::from)
    }
}

/// Reply to a previously sent request
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    pub request_id: u64,
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseFrame {
    /// Turn the frame into the outcome handed to the waiting caller
    pub fn into_outcome(self) -> Result<Value> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(ClientError::Application(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}

/// Any frame the server may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    LogUpdate(LogRecord),
    StatsUpdate(StatsSnapshot),
    Response(ResponseFrame),
    #[serde(other)]
    Unknown,
}

/// Payload of a `download_logs` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPayload {
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_frame_shape() {
        let frame = RequestFrame::new(RequestKind::GetLogs, 7, json!({"limit": 100}));
        let value: Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
        assert_eq!(value["type"], "request");
        assert_eq!(value["requestType"], "get_logs");
        assert_eq!(value["requestId"], 7);
        assert_eq!(value["data"]["limit"], 100);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_parse_log_update() {
        let frame: InboundFrame = serde_json::from_str(
            r#"{"type":"log_update","level":"WARN","message":"disk almost full","timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        match frame {
            InboundFrame::LogUpdate(record) => {
                assert_eq!(record.level, "WARN");
                assert_eq!(record.message, "disk almost full");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_type() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Unknown));
    }

    #[test]
    fn test_response_outcome() {
        let ok: ResponseFrame =
            serde_json::from_str(r#"{"requestId":1,"success":true,"data":[1,2]}"#).unwrap();
        assert_eq!(ok.into_outcome().unwrap(), json!([1, 2]));

        let failed: ResponseFrame =
            serde_json::from_str(r#"{"requestId":2,"success":false,"error":"denied"}"#).unwrap();
        match failed.into_outcome() {
            Err(ClientError::Application(msg)) => assert_eq!(msg, "denied"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
