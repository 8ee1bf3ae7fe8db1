//! Socket.IO (Engine.IO v4) text framing used by the backend's push channel.
//!
//! Frames:
//! - `0{...}` open handshake, answered with `40`
//! - `2` ping, answered with `3`
//! - `40{...}` namespace connected, `41` disconnected
//! - `42["name", payload]` event (an ack id may precede the array)

use serde::Deserialize;
use serde_json::Value;

use crate::config::TerminalRole;
use crate::models::{Patient, PatientDelta};

use super::{ChannelError, ChannelEvent, ChannelResult};

pub const CONNECT_PACKET: &str = "40";
pub const PONG_PACKET: &str = "3";

pub const EVENT_SNAPSHOT: &str = "patientsSnapshot";
pub const EVENT_PATIENT_CHANGED: &str = "patientChanged";
pub const EVENT_PATIENT_REMOVED: &str = "patientRemoved";
pub const EVENT_DOCTORS_CHANGED: &str = "doctorsChanged";

pub const JOIN_FRONT_DESK: &str = "joinSegreteria";
pub const JOIN_STUDY: &str = "joinStudy";

/// A decoded transport frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open,
    Close,
    Ping,
    Pong,
    Connected,
    Disconnected,
    Event { name: String, payload: Value },
    /// Frames the adapter does not act on (noop, upgrade, acks)
    Ignored,
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> ChannelResult<Frame> {
    let mut chars = text.chars();
    let engine = chars
        .next()
        .ok_or_else(|| ChannelError::Malformed("empty frame".into()))?;

    match engine {
        '0' => Ok(Frame::Open),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_socket_packet(chars.as_str()),
        '5' | '6' => Ok(Frame::Ignored),
        other => Err(ChannelError::Malformed(format!(
            "unknown engine packet type '{}'",
            other
        ))),
    }
}

fn decode_socket_packet(body: &str) -> ChannelResult<Frame> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ChannelError::Malformed("empty socket packet".into()))?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => decode_event_body(rest),
        '4' => Err(ChannelError::Rejected(rest.to_string())),
        _ => Ok(Frame::Ignored),
    }
}

fn decode_event_body(rest: &str) -> ChannelResult<Frame> {
    // Skip a namespace ("/ns,") and an ack id before the JSON array
    let rest = match rest.strip_prefix('/') {
        Some(ns) => ns.split_once(',').map(|(_, r)| r).unwrap_or(""),
        None => rest,
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    let mut array: Vec<Value> = serde_json::from_str(rest)
        .map_err(|e| ChannelError::Malformed(format!("event body: {}", e)))?;
    if array.is_empty() {
        return Err(ChannelError::Malformed("event without name".into()));
    }

    let payload = if array.len() > 1 {
        array.swap_remove(1)
    } else {
        Value::Null
    };
    match array.swap_remove(0) {
        Value::String(name) => Ok(Frame::Event { name, payload }),
        other => Err(ChannelError::Malformed(format!("event name {}", other))),
    }
}

/// Encode an outbound event.
pub fn encode_event(name: &str, args: &[Value]) -> String {
    let mut array = Vec::with_capacity(args.len() + 1);
    array.push(Value::String(name.to_string()));
    array.extend(args.iter().cloned());
    format!("42{}", Value::Array(array))
}

/// Room-join command for a role; passive listeners join nothing.
pub fn join_frame(role: &TerminalRole) -> Option<String> {
    match role {
        TerminalRole::FrontDesk => Some(encode_event(JOIN_FRONT_DESK, &[])),
        TerminalRole::Study { study } => Some(encode_event(
            JOIN_STUDY,
            &[serde_json::to_value(study).unwrap_or(Value::Null)],
        )),
        TerminalRole::Display => None,
    }
}

#[derive(Deserialize)]
struct Removed {
    id: String,
}

/// Map a named event to a store event. Unknown names yield `None`.
pub fn decode_event(name: &str, payload: Value) -> ChannelResult<Option<ChannelEvent>> {
    let malformed = |e: serde_json::Error| ChannelError::Malformed(format!("{}: {}", name, e));

    let event = match name {
        EVENT_SNAPSHOT => {
            let entries: Vec<Value> = serde_json::from_value(payload).map_err(malformed)?;
            ChannelEvent::PatientsSnapshot(decode_snapshot_entries(entries))
        }
        EVENT_PATIENT_CHANGED => {
            let delta: PatientDelta = serde_json::from_value(payload).map_err(malformed)?;
            ChannelEvent::PatientChanged(delta)
        }
        EVENT_PATIENT_REMOVED => {
            let removed: Removed = serde_json::from_value(payload).map_err(malformed)?;
            ChannelEvent::PatientRemoved { id: removed.id }
        }
        EVENT_DOCTORS_CHANGED => ChannelEvent::DoctorsChanged,
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Decode each snapshot entry on its own; a bad record is dropped, not the whole list.
fn decode_snapshot_entries(entries: Vec<Value>) -> Vec<Patient> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Patient>(entry) {
            Ok(patient) => Some(patient),
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping undecodable snapshot entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientStatus, RoomId};

    #[test]
    fn test_engine_frames() {
        assert_eq!(decode_frame("0{\"sid\":\"abc\"}").unwrap(), Frame::Open);
        assert_eq!(decode_frame("2").unwrap(), Frame::Ping);
        assert_eq!(decode_frame("40{\"sid\":\"x\"}").unwrap(), Frame::Connected);
        assert_eq!(decode_frame("41").unwrap(), Frame::Disconnected);
        assert!(decode_frame("").is_err());
        assert!(decode_frame("9").is_err());
    }

    #[test]
    fn test_event_frame() {
        let frame = decode_frame(r#"42["patientRemoved",{"id":"p1"}]"#).unwrap();
        assert_eq!(
            frame,
            Frame::Event {
                name: "patientRemoved".into(),
                payload: serde_json::json!({"id": "p1"}),
            }
        );
    }

    #[test]
    fn test_event_frame_with_ack_and_namespace() {
        let frame = decode_frame(r#"4217["doctorsChanged"]"#).unwrap();
        assert_eq!(
            frame,
            Frame::Event {
                name: "doctorsChanged".into(),
                payload: Value::Null,
            }
        );

        let frame = decode_frame(r#"42/clinic,["doctorsChanged"]"#).unwrap();
        assert!(matches!(frame, Frame::Event { ref name, .. } if name == "doctorsChanged"));
    }

    #[test]
    fn test_connect_error() {
        assert!(matches!(
            decode_frame(r#"44{"message":"unauthorized"}"#),
            Err(ChannelError::Rejected(_))
        ));
    }

    #[test]
    fn test_join_frames() {
        assert_eq!(
            join_frame(&TerminalRole::FrontDesk).unwrap(),
            r#"42["joinSegreteria"]"#
        );
        assert_eq!(
            join_frame(&TerminalRole::Study {
                study: RoomId::Number(3)
            })
            .unwrap(),
            r#"42["joinStudy",3]"#
        );
        assert!(join_frame(&TerminalRole::Display).is_none());
    }

    #[test]
    fn test_decode_snapshot() {
        let payload = serde_json::json!([
            {"id": "p1", "full_name": "A", "status": "in_attesa", "assigned_number": 1},
            {"id": "p2", "full_name": "B", "status": "prenotato", "assigned_number": 2}
        ]);
        match decode_event(EVENT_SNAPSHOT, payload).unwrap() {
            Some(ChannelEvent::PatientsSnapshot(list)) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].status, PatientStatus::Waiting);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_keeps_decodable_entries() {
        let payload = serde_json::json!([
            {"id": "a", "full_name": "A", "status": "in_attesa", "assigned_number": 1},
            {"id": "b", "full_name": "B", "status": "in_attesa", "assigned_number": null},
            {"id": "c", "full_name": "C", "status": "sconosciuto"},
            "not a record"
        ]);
        match decode_event(EVENT_SNAPSHOT, payload).unwrap() {
            Some(ChannelEvent::PatientsSnapshot(list)) => {
                let ids: Vec<&str> = list.iter().map(|p| p.id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b"]);
                assert_eq!(list[1].assigned_number, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_must_be_a_list() {
        let result = decode_event(EVENT_SNAPSHOT, serde_json::json!({"id": "a"}));
        assert!(matches!(result, Err(ChannelError::Malformed(_))));
    }

    #[test]
    fn test_decode_malformed_delta() {
        let result = decode_event(EVENT_PATIENT_CHANGED, serde_json::json!({"status": "x"}));
        assert!(matches!(result, Err(ChannelError::Malformed(_))));
    }

    #[test]
    fn test_unknown_event_ignored() {
        assert!(decode_event("patientsUpdated", Value::Null).unwrap().is_none());
    }
}
