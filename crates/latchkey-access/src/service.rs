//! On-demand tag reads and their HTTP response shape.
//!
//! Routing and transport belong to the embedding server; this module turns
//! a request's `timeout_sec` value into a read and the read into a status
//! code plus JSON body.

use crate::error::Result;
use crate::protocol::read_next_tag;
use latchkey_core::TagReadResult;
use latchkey_core::constants::DEFAULT_READ_TIMEOUT_MS;
use latchkey_hardware::SharedReader;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Details about the tag in front of the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: String,
    pub data: String,
}

/// Snapshot returned to API callers.
///
/// `tag_info` is present exactly when `is_tag_available` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagState {
    pub uuid: Uuid,
    pub is_tag_available: bool,
    pub tag_info: Option<TagInfo>,
}

impl TagState {
    /// Wrap a read result under a fresh state identifier.
    pub fn from_read(result: &TagReadResult) -> Self {
        let tag_info = result.tag_id().map(|id| TagInfo {
            id: id.to_string(),
            data: result.data().unwrap_or_default().to_string(),
        });

        Self {
            uuid: Uuid::new_v4(),
            is_tag_available: tag_info.is_some(),
            tag_info,
        }
    }
}

/// Performs single reads on the reader shared with the access loop.
#[derive(Debug, Clone)]
pub struct ReadTagService {
    reader: SharedReader,
}

impl ReadTagService {
    pub fn new(reader: SharedReader) -> Self {
        Self { reader }
    }

    /// Read the next tag presented within `timeout`.
    ///
    /// Competes with the access loop for the reader: whichever read is in
    /// flight when a tag arrives gets it.
    pub async fn read_next_tag(&self, timeout: Duration) -> Result<TagState> {
        info!(timeout_ms = timeout.as_millis() as u64, "Attempting to read next available tag");

        let mut reader = self.reader.clone();
        let result = read_next_tag(&mut reader, timeout).await?;
        let state = TagState::from_read(&result);

        info!(uuid = %state.uuid, available = state.is_tag_available, "Read tag state");
        Ok(state)
    }
}

/// Parse the `timeout_sec` query value.
///
/// Missing, malformed or non-positive values fall back to the default of
/// five seconds.
pub fn parse_timeout(timeout_sec: Option<&str>) -> Duration {
    let default = Duration::from_millis(DEFAULT_READ_TIMEOUT_MS);
    let Some(raw) = timeout_sec else {
        return default;
    };

    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        _ => {
            warn!(value = raw, "Ignoring invalid timeout_sec");
            default
        }
    }
}

/// A status code and body ready for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json(state: &TagState) -> Self {
        match serde_json::to_string(state) {
            Ok(body) => Self {
                status: 200,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::internal_error(&e),
        }
    }

    fn internal_error(error: &dyn std::fmt::Display) -> Self {
        Self {
            status: 500,
            content_type: "text/plain; charset=utf-8",
            body: error.to_string(),
        }
    }
}

/// Serve "read next tag": read with the requested timeout and shape the reply.
pub async fn handle_read_next_tag(service: &ReadTagService, timeout_sec: Option<&str>) -> ApiResponse {
    let timeout = parse_timeout(timeout_sec);

    match service.read_next_tag(timeout).await {
        Ok(state) => ApiResponse::json(&state),
        Err(e) => {
            error!(error = %e, "Failed to read next tag");
            ApiResponse::internal_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_hardware::mock::ScriptedLink;
    use latchkey_hardware::noop::NoopReader;
    use latchkey_hardware::reader::{HardwareReader, ReaderConfig};
    use rstest::rstest;

    #[rstest]
    #[case(None, Duration::from_secs(5))]
    #[case(Some("2"), Duration::from_secs(2))]
    #[case(Some(" 0.5 "), Duration::from_millis(500))]
    #[case(Some("0"), Duration::from_secs(5))]
    #[case(Some("-3"), Duration::from_secs(5))]
    #[case(Some("soon"), Duration::from_secs(5))]
    #[case(Some("NaN"), Duration::from_secs(5))]
    fn test_parse_timeout(#[case] raw: Option<&str>, #[case] expected: Duration) {
        assert_eq!(parse_timeout(raw), expected);
    }

    #[test]
    fn test_state_from_absent_read() {
        let state = TagState::from_read(&TagReadResult::absent());
        assert!(!state.is_tag_available);
        assert_eq!(state.tag_info, None);
    }

    #[test]
    fn test_states_get_distinct_ids() {
        let result = TagReadResult::present(&[1, 2, 3, 4]);
        assert_ne!(TagState::from_read(&result).uuid, TagState::from_read(&result).uuid);
    }

    #[tokio::test]
    async fn test_noop_response_body() {
        let service = ReadTagService::new(SharedReader::new(NoopReader::new()));
        let response = handle_read_next_tag(&service, None).await;

        assert_eq!(response.status, 200);
        let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(json["is_tag_available"], true);
        assert_eq!(json["tag_info"]["id"], "00000000000000000000000000000000");
        assert_eq!(json["tag_info"]["data"], "");
        assert!(json["uuid"].as_str().unwrap().parse::<Uuid>().is_ok());
    }

    #[tokio::test]
    async fn test_no_tag_response_body() {
        let (opener, _handle) = ScriptedLink::new();
        let reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
        let mut init = reader.clone();
        latchkey_hardware::TagReader::initialize(&mut init).await.unwrap();

        let service = ReadTagService::new(reader);
        let response = handle_read_next_tag(&service, Some("1")).await;

        assert_eq!(response.status, 200);
        let state: TagState = serde_json::from_str(&response.body).unwrap();
        assert!(!state.is_tag_available);
        assert!(state.tag_info.is_none());
        assert!(response.body.contains("\"tag_info\":null"));
    }

    #[tokio::test]
    async fn test_reader_failure_is_500() {
        let (opener, _handle) = ScriptedLink::new();
        let service = ReadTagService::new(SharedReader::new(HardwareReader::new(
            opener,
            ReaderConfig::default(),
        )));

        // Never initialized.
        let response = handle_read_next_tag(&service, None).await;
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "Reader error: Reader not initialized");
    }
}
