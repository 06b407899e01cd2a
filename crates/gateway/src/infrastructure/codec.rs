//! socket.io / Engine.IO v3 framing
//!
//! Outbound events are `42["action",payload]`. Inbound traffic mixes text
//! control packets, `451-` placeholder tags and binary attachments that start
//! with a `0x04` marker byte followed by JSON.

use serde_json::Value;

use crate::domain::{Frame, FrameKind};

const BINARY_MARKER: u8 = 0x04;

/// Encode an outbound event
pub fn encode(action: &str, payload: Option<&Value>) -> String {
    let action = Value::String(action.to_string());
    match payload {
        Some(payload) => format!("42[{},{}]", action, payload),
        None => format!("42[{}]", action),
    }
}

/// Decode an inbound frame. Never fails; unparseable input becomes `Raw`.
pub fn decode(raw: &[u8]) -> Frame {
    if raw.first() == Some(&BINARY_MARKER) {
        let text = String::from_utf8_lossy(&raw[1..]).into_owned();
        let kind = match serde_json::from_str(&text) {
            Ok(value) => FrameKind::Json(value),
            Err(_) => FrameKind::Raw,
        };
        return Frame::new(text, kind);
    }

    let text = String::from_utf8_lossy(raw).into_owned();
    let kind = decode_text(&text);
    Frame::new(text, kind)
}

fn decode_text(text: &str) -> FrameKind {
    match text {
        "2" => return FrameKind::Ping,
        "3" => return FrameKind::Pong,
        "40" => return FrameKind::Connected,
        "41" => return FrameKind::Disconnect,
        _ => {}
    }

    if let Some(body) = text.strip_prefix('0') {
        if body.starts_with('{') {
            return match serde_json::from_str(body) {
                Ok(value) => FrameKind::Handshake(value),
                Err(_) => FrameKind::Raw,
            };
        }
    }

    if let Some(body) = text.strip_prefix("451-") {
        return match parse_array(body).and_then(|items| items.first().cloned()) {
            Some(Value::String(tag)) => FrameKind::Tag(tag),
            _ => FrameKind::Raw,
        };
    }

    if let Some(body) = text.strip_prefix("42") {
        if let Some(mut items) = parse_array(body) {
            if let Some(Value::String(_)) = items.first() {
                let payload = if items.len() > 1 { Some(items.swap_remove(1)) } else { None };
                if let Value::String(action) = items.swap_remove(0) {
                    return FrameKind::Event { action, payload };
                }
            }
        }
        return FrameKind::Raw;
    }

    // Other packets: drop the type byte and see whether JSON follows
    match text.get(1..).map(serde_json::from_str::<Value>) {
        Some(Ok(value)) => FrameKind::Json(value),
        _ => FrameKind::Raw,
    }
}

fn parse_array(body: &str) -> Option<Vec<Value>> {
    match serde_json::from_str(body) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}
