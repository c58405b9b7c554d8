// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <message.rs>

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// One text message, inbound (has `sender`) or outbound (has `receiver`).
///
/// Field names are the bus contract. The PascalCase aliases accept payloads
/// produced by older .NET publishers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SmsMessage {
    #[serde(alias = "Content")]
    pub content: String,
    #[serde(
        alias = "Timestamp",
        default = "Utc::now",
        deserialize_with = "lenient_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "Sender", default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(alias = "Receiver", default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

/// Offset-less timestamps are read as UTC. Anything unreadable (or `null`)
/// becomes the decode time: the timestamp never decides whether a message
/// is sent.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(Utc::now());
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(ts.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Ok(naive.and_utc()),
        Err(e) => {
            log::warn!("[Message] Unreadable timestamp {:?} ({}), using now", raw, e);
            Ok(Utc::now())
        }
    }
}

impl SmsMessage {
    /// Inbound records are stamped with the local processing time.
    pub fn inbound(content: impl Into<String>, sender: impl Into<String>) -> Self {
        SmsMessage {
            content: content.into(),
            timestamp: Utc::now(),
            sender: Some(sender.into()),
            receiver: None,
        }
    }

    /// Receiver with surrounding whitespace removed, if there is a usable one.
    pub fn receiver(&self) -> Option<&str> {
        self.receiver
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a bus payload. Blank payloads and a JSON `null` yield `Ok(None)`.
    pub fn from_payload(payload: &str) -> Result<Option<Self>> {
        if payload.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Option<SmsMessage>>(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::outbound;
    use serde_json::Value;

    #[test]
    fn payload_round_trip_keeps_fields() {
        let original = outbound("Ping", "+4799999999");
        let payload = original.to_payload().unwrap();
        let decoded = SmsMessage::from_payload(&payload).unwrap().unwrap();

        assert_eq!(decoded.content, original.content);
        assert_eq!(decoded.receiver, original.receiver);
        assert_eq!(decoded.sender, None);
        assert_eq!(decoded.timestamp, original.timestamp);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let payload = SmsMessage::inbound("Hello", "12345").to_payload().unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["content"], "Hello");
        assert_eq!(obj["sender"], "12345");
        assert!(obj.contains_key("timestamp"));
        assert!(!obj.contains_key("receiver"));
    }

    #[test]
    fn accepts_pascal_case_and_missing_timestamp() {
        let msg = SmsMessage::from_payload(r#"{"Content":"Hi","Receiver":"555","Sender":null}"#)
            .unwrap()
            .unwrap();
        assert_eq!(msg.content, "Hi");
        assert_eq!(msg.receiver(), Some("555"));
        assert_eq!(msg.sender, None);
    }

    #[test]
    fn timestamp_without_offset_is_read_as_utc() {
        let msg = SmsMessage::from_payload(
            r#"{"Content":"Hi","Timestamp":"2024-05-01T12:30:45.1234567","Receiver":"555"}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(msg.receiver(), Some("555"));
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-05-01T12:30:45.123456700+00:00");
    }

    #[test]
    fn timestamp_with_offset_is_converted_to_utc() {
        let msg = SmsMessage::from_payload(
            r#"{"content":"Hi","timestamp":"2024-05-01T12:30:45+02:00","receiver":"555"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-05-01T10:30:45+00:00");
    }

    #[test]
    fn unreadable_timestamp_does_not_drop_the_message() {
        let before = Utc::now();
        for payload in [
            r#"{"content":"Hi","timestamp":"yesterday","receiver":"555"}"#,
            r#"{"content":"Hi","timestamp":null,"receiver":"555"}"#,
        ] {
            let msg = SmsMessage::from_payload(payload).unwrap().unwrap();
            assert_eq!(msg.receiver(), Some("555"));
            assert!(msg.timestamp >= before);
        }
    }

    #[test]
    fn blank_and_null_payloads_decode_to_nothing() {
        assert!(SmsMessage::from_payload("   \n").unwrap().is_none());
        assert!(SmsMessage::from_payload("null").unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(SmsMessage::from_payload("{\"content\":").is_err());
        assert!(SmsMessage::from_payload(r#"{"receiver":"555"}"#).is_err());
    }

    #[test]
    fn blank_receiver_is_not_usable() {
        let mut msg = outbound("x", "  ");
        assert_eq!(msg.receiver(), None);
        msg.receiver = None;
        assert_eq!(msg.receiver(), None);
    }
}
