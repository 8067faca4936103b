// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message-bus request handling.
//
// Requests arrive on `<action>.request` channels and are answered on the
// matching `.response` channel with the caller's correlation id. The
// transport itself is left to the caller; this module only maps a request
// to a response.

use pitr_heal::ArchiveEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const LIST_DAYS_CHANNEL: &str = "pitr.list_days.request";
pub const GET_WINDOW_CHANNEL: &str = "pitr.get_window.request";

/// Channels the service answers on.
pub const REQUEST_CHANNELS: [&str; 2] = [LIST_DAYS_CHANNEL, GET_WINDOW_CHANNEL];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRequest {
    pub correlation_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusResponse {
    pub correlation_id: String,
    pub ok: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BusResponse {
    fn success(correlation_id: String, data: Value) -> Self {
        Self {
            correlation_id,
            ok: true,
            data,
            error: None,
        }
    }

    fn failure(correlation_id: String, error: impl Into<String>) -> Self {
        Self {
            correlation_id,
            ok: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Channel a response to a request received on `channel` is published on.
pub fn response_channel(channel: &str) -> String {
    channel.replacen(".request", ".response", 1)
}

/// Answer a request that arrived on `channel`.
///
/// The channel decides the operation; `request.action` is consulted only
/// when the channel is not one of [`REQUEST_CHANNELS`].
pub async fn dispatch(engine: &ArchiveEngine, channel: &str, request: BusRequest) -> BusResponse {
    let operation = if REQUEST_CHANNELS.contains(&channel) {
        channel.trim_end_matches(".request").to_string()
    } else {
        request.action.clone()
    };
    debug!(channel, operation = %operation, correlation_id = %request.correlation_id, "Bus request");

    match operation.as_str() {
        "pitr.list_days" => to_response(request.correlation_id, &engine.list_days().await),
        "pitr.get_window" => {
            let Some(day) = request.day.as_deref() else {
                return BusResponse::failure(request.correlation_id, "missing day");
            };
            match engine.get_metadata(day).await {
                Ok(metadata) => to_response(request.correlation_id, &metadata),
                Err(err) => BusResponse::failure(request.correlation_id, err.to_string()),
            }
        }
        other => {
            warn!(operation = other, "Unsupported bus request");
            BusResponse::failure(request.correlation_id, format!("unsupported action: {other}"))
        }
    }
}

/// Decode a raw payload and answer it. Undecodable payloads have no
/// correlation id to answer to and yield `None`.
pub async fn dispatch_payload(engine: &ArchiveEngine, channel: &str, payload: &[u8]) -> Option<BusResponse> {
    match serde_json::from_slice::<BusRequest>(payload) {
        Ok(request) => Some(dispatch(engine, channel, request).await),
        Err(err) => {
            warn!(channel, error = %err, "Dropping malformed bus request");
            None
        }
    }
}

fn to_response<T: Serialize>(correlation_id: String, data: &T) -> BusResponse {
    match serde_json::to_value(data) {
        Ok(value) => BusResponse::success(correlation_id, value),
        Err(err) => BusResponse::failure(correlation_id, err.to_string()),
    }
}
