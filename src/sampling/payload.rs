//! Wire contracts for the rig: strict decoding of inbound sample messages and
//! the outbound derived-reading shape.
//!
//! Inbound messages are JSON objects with required integer channels `C1..C4`,
//! an optional `timestamp` in epoch milliseconds, and optional flag fields
//! `F1..F3` / `P1..P3` that senders variously encode as booleans or 0/1
//! numbers. Anything that does not match this schema is rejected as
//! `MalformedPayload`; there is no lenient fallback parsing.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::sampling::calib::{DerivedSample, RawSample};
use crate::sampling::error::RigError;

/// Current wall clock as epoch milliseconds, the fallback timestamp for
/// senders that omit the field.
pub fn wall_clock_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64
}

/// Decoded inbound message, prior to timestamp resolution.
#[derive(Clone, Debug, Deserialize)]
pub struct RawPayload {
    #[serde(rename = "C1")]
    pub c1: i32,
    #[serde(rename = "C2")]
    pub c2: i32,
    #[serde(rename = "C3")]
    pub c3: i32,
    #[serde(rename = "C4")]
    pub c4: i32,
    /// Epoch milliseconds at the sender, if it stamps its messages.
    #[serde(default, rename = "timestamp")]
    pub timestamp_millis: Option<f64>,
    #[serde(default, rename = "F1", deserialize_with = "flag")]
    pub f1: bool,
    #[serde(default, rename = "F2", deserialize_with = "flag")]
    pub f2: bool,
    #[serde(default, rename = "F3", deserialize_with = "flag")]
    pub f3: bool,
    #[serde(default, rename = "P1", deserialize_with = "flag")]
    pub p1: bool,
    #[serde(default, rename = "P2", deserialize_with = "flag")]
    pub p2: bool,
    #[serde(default, rename = "P3", deserialize_with = "flag")]
    pub p3: bool,
}

/// Accepts `true`/`false`, any number (zero is false), or `null`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Truthy {
        Bool(bool),
        Num(f64),
    }
    Ok(match Option::<Truthy>::deserialize(deserializer)? {
        Some(Truthy::Bool(b)) => b,
        Some(Truthy::Num(n)) => n != 0.0,
        None => false,
    })
}

impl RawPayload {
    pub fn parse(bytes: &[u8]) -> Result<Self, RigError> {
        serde_json::from_slice(bytes).map_err(|e| RigError::malformed(e.to_string()))
    }

    /// Resolve into a `RawSample`, timestamped in seconds. `fallback_millis`
    /// is used when the sender did not stamp the message.
    pub fn into_sample(self, fallback_millis: f64) -> RawSample {
        RawSample {
            timestamp: self.timestamp_millis.unwrap_or(fallback_millis) / 1000.0,
            channels: [self.c1, self.c2, self.c3, self.c4],
            flags: [self.f1, self.f2, self.f3],
            positions: [self.p1, self.p2, self.p3],
        }
    }
}

/// Outbound derived reading, published once per ingested sample.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OutboundReading {
    /// Epoch seconds.
    pub timestamp: f64,
    #[serde(rename = "C1")]
    pub c1: i32,
    #[serde(rename = "C2")]
    pub c2: i32,
    #[serde(rename = "C3")]
    pub c3: i32,
    #[serde(rename = "C4")]
    pub c4: i32,
    #[serde(rename = "F1")]
    pub f1: u8,
    #[serde(rename = "F2")]
    pub f2: u8,
    #[serde(rename = "F3")]
    pub f3: u8,
    #[serde(rename = "P1")]
    pub p1: u8,
    #[serde(rename = "P2")]
    pub p2: u8,
    #[serde(rename = "P3")]
    pub p3: u8,
    #[serde(rename = "R1")]
    pub r1: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
    #[serde(rename = "R3")]
    pub r3: f64,
}

impl OutboundReading {
    pub fn new(raw: &RawSample, derived: &DerivedSample) -> Self {
        Self {
            timestamp: raw.timestamp,
            c1: raw.channels[0],
            c2: raw.channels[1],
            c3: raw.channels[2],
            c4: raw.channels[3],
            f1: raw.flags[0] as u8,
            f2: raw.flags[1] as u8,
            f3: raw.flags[2] as u8,
            p1: raw.positions[0] as u8,
            p2: raw.positions[1] as u8,
            p3: raw.positions[2] as u8,
            r1: derived.resistances[0],
            r2: derived.resistances[1],
            r3: derived.resistances[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_message() {
        let p = RawPayload::parse(br#"{"C1":1,"C2":2,"C3":3,"C4":4}"#).unwrap();
        let s = p.into_sample(2000.0);
        assert_eq!(s.channels, [1, 2, 3, 4]);
        assert_eq!(s.timestamp, 2.0); // fallback milliseconds -> seconds
        assert_eq!(s.flags, [false; 3]);
        assert_eq!(s.positions, [false; 3]);
    }

    #[test]
    fn sender_timestamp_wins_over_fallback() {
        let p =
            RawPayload::parse(br#"{"C1":0,"C2":0,"C3":0,"C4":0,"timestamp":1500}"#).unwrap();
        assert_eq!(p.into_sample(9_999_999.0).timestamp, 1.5);
    }

    #[test]
    fn flags_accept_bools_and_numbers() {
        let p = RawPayload::parse(
            br#"{"C1":0,"C2":0,"C3":0,"C4":0,"F1":true,"F2":0,"F3":1,"P2":false,"P3":null}"#,
        )
        .unwrap();
        let s = p.into_sample(0.0);
        assert_eq!(s.flags, [true, false, true]);
        assert_eq!(s.positions, [false, false, false]);
    }

    #[test]
    fn missing_channel_is_malformed() {
        let err = RawPayload::parse(br#"{"C1":1,"C2":2,"C3":3}"#).unwrap_err();
        assert!(matches!(err, RigError::MalformedPayload { .. }));
    }

    #[test]
    fn non_numeric_channel_is_malformed() {
        let err = RawPayload::parse(br#"{"C1":"high","C2":2,"C3":3,"C4":4}"#).unwrap_err();
        assert!(matches!(err, RigError::MalformedPayload { .. }));
    }

    #[test]
    fn garbage_is_malformed_not_evaluated() {
        let err = RawPayload::parse(b"__import__('os')").unwrap_err();
        assert!(matches!(err, RigError::MalformedPayload { .. }));
    }

    #[test]
    fn outbound_reading_shape() {
        let raw = RawSample {
            timestamp: 1.0,
            channels: [8192, 16384, 24576, 32767],
            flags: [true, false, false],
            positions: [false, false, true],
        };
        let derived = DerivedSample::from_raw(&raw);
        let reading = OutboundReading::new(&raw, &derived);
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&reading).unwrap()).unwrap();
        assert_eq!(json["timestamp"], 1.0);
        assert_eq!(json["C1"], 8192);
        assert_eq!(json["F1"], 1);
        assert_eq!(json["P3"], 1);
        assert_eq!(json["R1"], 10.0);
    }
}
