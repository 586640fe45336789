//! Classification of opaque signaling notifications.
//!
//! Payloads arrive in several shapes depending on the collaborator version: a
//! bare string, an object with `type`, an object wrapping a `notification`
//! with its own `type`, or an object with only an `id`. Any of those fields
//! matching a room-ended marker makes the payload authoritative.

use serde_json::Value;

/// Message shown when a room-ended payload carries none of its own.
pub const DEFAULT_END_MESSAGE: &str = "The session has ended by the mentor.";

/// Lower-cased markers; a field matches if it contains any of them.
const ROOM_ENDED_MARKERS: [&str; 2] = ["room_ended", "room-ended"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The host ended the room. Carries the message to display.
    RoomEnded { message: String },
    /// Anything else; dropped by the coordinator.
    Other,
}

/// Classify a notification payload.
#[must_use]
pub fn classify(payload: &Value) -> Notification {
    let is_room_ended = match payload {
        Value::String(s) => matches_marker(s),
        Value::Object(_) => [
            payload.get("type"),
            payload.pointer("/notification/type"),
            payload.get("id"),
        ]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .any(matches_marker),
        _ => false,
    };

    if !is_room_ended {
        return Notification::Other;
    }

    let message = [payload.get("message"), payload.pointer("/notification/message")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map_or_else(|| DEFAULT_END_MESSAGE.to_string(), str::to_string);

    Notification::RoomEnded { message }
}

fn matches_marker(field: &str) -> bool {
    let lowered = field.to_ascii_lowercase();
    ROOM_ENDED_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
