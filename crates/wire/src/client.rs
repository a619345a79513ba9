// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! JSON frames exchanged with WebSocket clients over `/ws`.
//!
//! Client requests are a uniform shape. Server responses are not: terminal
//! call responses are bare `{id, result}` / `{id, error}` frames with no
//! `type` tag, while unsolicited/meta frames (`welcome`, `functions_updated`,
//! `progress`, untargeted `error`, idle `ping`) carry `{"type": "..."}`.
//! That asymmetry is why [`ServerMessage`] hand-rolls `Serialize` instead of
//! using `#[serde(tag = "type")]`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A single client request frame: `{ "id": <string>, "method": "<tool>.<function>", "args": <object> }`.
///
/// `id` is absent for fire-and-forget style calls (none currently routed
/// without a response, but the field stays optional to match the wire
/// shape). `method`/`script` being both absent on the first frame of a
/// connection triggers the welcome handshake rather than routing.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    pub id: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub script: Option<Value>,
}

/// Every frame the server can send to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Terminal success response: bare `{id, result}`.
    Result { id: String, result: Value },
    /// Terminal failure response: bare `{id, error}`.
    Error { id: String, error: String },
    /// Sent once, on the first non-call frame of a connection.
    Welcome { functions: Vec<String> },
    /// Broadcast whenever the tool registry changes.
    FunctionsUpdated { functions: Vec<String> },
    /// Advisory, non-terminal; shares `id` with the in-flight call.
    Progress { id: String, message: String },
    /// Server-initiated error with no associated request id.
    ServerError { error: String },
    /// Idle-connection keepalive probe.
    Ping,
}

impl Serialize for ServerMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = match self {
            ServerMessage::Result { id, result } => {
                serde_json::json!({ "id": id, "result": result })
            }
            ServerMessage::Error { id, error } => {
                serde_json::json!({ "id": id, "error": error })
            }
            ServerMessage::Welcome { functions } => {
                serde_json::json!({ "type": "welcome", "functions": functions })
            }
            ServerMessage::FunctionsUpdated { functions } => {
                serde_json::json!({ "type": "functions_updated", "functions": functions })
            }
            ServerMessage::Progress { id, message } => {
                serde_json::json!({ "type": "progress", "id": id, "message": message })
            }
            ServerMessage::ServerError { error } => {
                serde_json::json!({ "type": "error", "error": error })
            }
            ServerMessage::Ping => serde_json::json!({ "type": "ping" }),
        };
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| D::Error::custom("expected object"))?;

        if let Some(tag) = obj.get("type").and_then(Value::as_str) {
            return match tag {
                "welcome" => Ok(ServerMessage::Welcome {
                    functions: parse_string_list(obj.get("functions"))?,
                }),
                "functions_updated" => Ok(ServerMessage::FunctionsUpdated {
                    functions: parse_string_list(obj.get("functions"))?,
                }),
                "progress" => Ok(ServerMessage::Progress {
                    id: parse_string_field(obj.get("id"))?,
                    message: parse_string_field(obj.get("message"))?,
                }),
                "error" => Ok(ServerMessage::ServerError {
                    error: parse_string_field(obj.get("error"))?,
                }),
                "ping" => Ok(ServerMessage::Ping),
                other => Err(D::Error::custom(format!("unknown server message type {other:?}"))),
            };
        }

        let id = parse_string_field(obj.get("id"))?;
        if let Some(error) = obj.get("error") {
            return Ok(ServerMessage::Error {
                id,
                error: error.as_str().ok_or_else(|| D::Error::custom("error must be a string"))?.to_owned(),
            });
        }
        if let Some(result) = obj.get("result") {
            return Ok(ServerMessage::Result { id, result: result.clone() });
        }
        Err(D::Error::custom("frame has neither type, result, nor error"))
    }
}

fn parse_string_field<E: serde::de::Error>(value: Option<&Value>) -> Result<String, E> {
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| E::custom("missing or non-string field"))
}

fn parse_string_list<E: serde::de::Error>(value: Option<&Value>) -> Result<Vec<String>, E> {
    value
        .and_then(Value::as_array)
        .ok_or_else(|| E::custom("missing functions array"))?
        .iter()
        .map(|v| v.as_str().map(str::to_owned).ok_or_else(|| E::custom("function name must be a string")))
        .collect()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
