//! Relay wire frames.
//!
//! Every frame is a JSON array whose first element is a label:
//!
//! | direction | frame |
//! |-----------|-------|
//! | client → relay | `["REQ", sub_id, filter]`, `["CLOSE", sub_id]`, `["EVENT", event]` |
//! | relay → client | `["EVENT", sub_id, event]`, `["EOSE", sub_id]`, `["OK", id, accepted, message]`, `["NOTICE", msg]`, `["CLOSED", sub_id, reason]`, `["ERROR", reason]` |

use agora_events::{RawEvent, SignedEvent};
use agora_types::{EventId, PublicKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// Subscription filter sent with `REQ`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub kinds: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<PublicKey>>,
}

/// Frames this client sends.
#[derive(Clone, Debug)]
pub enum ClientFrame<'a> {
    Req { sub_id: &'a str, filter: &'a Filter },
    Close { sub_id: &'a str },
    Event(&'a SignedEvent),
}

impl ClientFrame<'_> {
    pub fn to_json(&self) -> String {
        match self {
            ClientFrame::Req { sub_id, filter } => serde_json::json!(["REQ", sub_id, filter]),
            ClientFrame::Close { sub_id } => serde_json::json!(["CLOSE", sub_id]),
            ClientFrame::Event(event) => serde_json::json!(["EVENT", event]),
        }
        .to_string()
    }
}

/// Frames a relay sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayFrame {
    Event { sub_id: String, event: RawEvent },
    Eose { sub_id: String },
    Ok {
        id: EventId,
        accepted: bool,
        message: String,
    },
    Notice(String),
    Closed { sub_id: String, reason: String },
    Error(String),
    /// A well-formed frame with a label this client does not handle.
    Other(String),
}

impl RelayFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let items: Vec<Value> =
            serde_json::from_str(text).map_err(|e| FrameError::NotAnArray(e.to_string()))?;
        let label = items
            .first()
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingLabel)?;
        let malformed = |reason: &str| FrameError::Malformed {
            label: label.to_string(),
            reason: reason.to_string(),
        };

        let frame = match label {
            "EVENT" => {
                let sub_id = string_at(&items, 1).ok_or_else(|| malformed("missing sub_id"))?;
                let raw = items.get(2).cloned().ok_or_else(|| malformed("missing event"))?;
                let event: RawEvent =
                    serde_json::from_value(raw).map_err(|e| malformed(&e.to_string()))?;
                RelayFrame::Event { sub_id, event }
            }
            "EOSE" => RelayFrame::Eose {
                sub_id: string_at(&items, 1).ok_or_else(|| malformed("missing sub_id"))?,
            },
            "OK" => {
                let id = string_at(&items, 1)
                    .ok_or_else(|| malformed("missing id"))
                    .and_then(|s| EventId::from_hex(&s).map_err(|e| malformed(&e.to_string())))?;
                let accepted = items
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| malformed("missing accepted flag"))?;
                RelayFrame::Ok {
                    id,
                    accepted,
                    message: string_at(&items, 3).unwrap_or_default(),
                }
            }
            "NOTICE" => RelayFrame::Notice(string_at(&items, 1).unwrap_or_default()),
            "CLOSED" => RelayFrame::Closed {
                sub_id: string_at(&items, 1).ok_or_else(|| malformed("missing sub_id"))?,
                reason: string_at(&items, 2).unwrap_or_default(),
            },
            "ERROR" => RelayFrame::Error(string_at(&items, 1).unwrap_or_default()),
            other => RelayFrame::Other(other.to_string()),
        };
        Ok(frame)
    }
}

fn string_at(items: &[Value], index: usize) -> Option<String> {
    items.get(index).and_then(Value::as_str).map(str::to_string)
}
