//! Typed parsing of inbound live-session events.
//!
//! Every frame is a JSON envelope `{"event": "<kind>", "data": {...}}`.
//! Payloads are validated exhaustively per kind; unknown kinds are an
//! explicit error rather than a silent drop.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::session::AttendanceStatus;

/// A validated inbound event from a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Teacher marks one student present or absent.
    AttendanceMarked {
        student_id: Uuid,
        status: AttendanceStatus,
    },
    /// Teacher asks for the open session's aggregate counts.
    TodaySummary,
    /// Student asks for their own recorded status.
    MyAttendance,
}

/// Why an inbound frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    /// Envelope or payload does not match the expected shape.
    InvalidSchema,
    /// Well-formed envelope carrying an unrecognized event kind.
    UnknownEvent(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MarkPayload {
    student_id: Uuid,
    status: AttendanceStatus,
}

/// Parse a raw text frame into a [`ClientEvent`].
///
/// # Errors
///
/// Returns [`EventParseError::InvalidSchema`] for malformed JSON, a missing
/// or non-string `event` field, or a payload that fails validation, and
/// [`EventParseError::UnknownEvent`] for unrecognized event kinds.
pub fn parse_event(text: &str) -> Result<ClientEvent, EventParseError> {
    let envelope: Value =
        serde_json::from_str(text).map_err(|_| EventParseError::InvalidSchema)?;

    let kind = envelope
        .get("event")
        .and_then(Value::as_str)
        .ok_or(EventParseError::InvalidSchema)?;

    match kind {
        "ATTENDANCE_MARKED" => {
            let data = envelope
                .get("data")
                .cloned()
                .ok_or(EventParseError::InvalidSchema)?;
            let payload: MarkPayload =
                serde_json::from_value(data).map_err(|_| EventParseError::InvalidSchema)?;
            Ok(ClientEvent::AttendanceMarked {
                student_id: payload.student_id,
                status: payload.status,
            })
        }
        // Query events carry no payload; an empty or missing `data` is fine.
        "TODAY_SUMMARY" => Ok(ClientEvent::TodaySummary),
        "MY_ATTENDANCE" => Ok(ClientEvent::MyAttendance),
        other => Err(EventParseError::UnknownEvent(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attendance_marked() {
        let student = Uuid::new_v4();
        let frame = format!(
            r#"{{"event":"ATTENDANCE_MARKED","data":{{"studentId":"{student}","status":"present"}}}}"#
        );

        assert_eq!(
            parse_event(&frame),
            Ok(ClientEvent::AttendanceMarked {
                student_id: student,
                status: AttendanceStatus::Present,
            })
        );
    }

    #[test]
    fn parses_query_events_with_or_without_data() {
        assert_eq!(
            parse_event(r#"{"event":"TODAY_SUMMARY","data":{}}"#),
            Ok(ClientEvent::TodaySummary)
        );
        assert_eq!(
            parse_event(r#"{"event":"MY_ATTENDANCE"}"#),
            Ok(ClientEvent::MyAttendance)
        );
    }

    #[test]
    fn non_string_event_kind_is_invalid_schema() {
        assert_eq!(
            parse_event(r#"{"event":123}"#),
            Err(EventParseError::InvalidSchema)
        );
    }

    #[test]
    fn malformed_json_is_invalid_schema() {
        assert_eq!(parse_event("not json"), Err(EventParseError::InvalidSchema));
        assert_eq!(parse_event(""), Err(EventParseError::InvalidSchema));
    }

    #[test]
    fn bad_mark_payloads_are_invalid_schema() {
        // Missing data entirely
        assert_eq!(
            parse_event(r#"{"event":"ATTENDANCE_MARKED"}"#),
            Err(EventParseError::InvalidSchema)
        );
        // studentId not a UUID
        assert_eq!(
            parse_event(
                r#"{"event":"ATTENDANCE_MARKED","data":{"studentId":"s1","status":"present"}}"#
            ),
            Err(EventParseError::InvalidSchema)
        );
        // Status outside the enum
        let student = Uuid::new_v4();
        let frame = format!(
            r#"{{"event":"ATTENDANCE_MARKED","data":{{"studentId":"{student}","status":"late"}}}}"#
        );
        assert_eq!(parse_event(&frame), Err(EventParseError::InvalidSchema));
    }

    #[test]
    fn unrecognized_kind_is_unknown_event() {
        assert_eq!(
            parse_event(r#"{"event":"SELF_DESTRUCT","data":{}}"#),
            Err(EventParseError::UnknownEvent("SELF_DESTRUCT".to_string()))
        );
    }
}
