//! Wire envelope wrapping an event on the broker log.
//!
//! The envelope pairs an event type tag with the raw payload bytes so
//! downstream consumers can route an event without parsing its body:
//!
//! ```text
//! [version: u8][type length: u16 BE][event type: utf-8][payload...]
//! ```
//!
//! Encoding and decoding are total, side-effect-free transforms:
//! `decode(encode(t, p)) == (t, p)` for every non-empty type `t` and every
//! payload `p`, including the empty payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::IngestError;

/// Wire format version tag, first byte of every envelope.
pub const WIRE_VERSION: u8 = 1;

/// Envelope decode/encode failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("event type must not be empty")]
    EmptyEventType,

    #[error("event type is {len} bytes, longer than the u16 length prefix allows")]
    EventTypeTooLong { len: usize },

    #[error("envelope truncated: need at least {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("unsupported envelope version {found}")]
    UnsupportedVersion { found: u8 },

    #[error("event type is not valid utf-8")]
    InvalidEventType,
}

/// An event type tag plus the untouched payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event_type: String,
    pub payload: Bytes,
}

impl Envelope {
    /// Build an envelope, validating the event type tag.
    pub fn new(
        event_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, EnvelopeError> {
        let event_type = event_type.into();
        if event_type.is_empty() {
            return Err(EnvelopeError::EmptyEventType);
        }
        if event_type.len() > u16::MAX as usize {
            return Err(EnvelopeError::EventTypeTooLong {
                len: event_type.len(),
            });
        }
        Ok(Self {
            event_type,
            payload: payload.into(),
        })
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Bytes {
        let type_bytes = self.event_type.as_bytes();
        let mut buf =
            BytesMut::with_capacity(3 + type_bytes.len() + self.payload.len());
        buf.put_u8(WIRE_VERSION);
        buf.put_u16(type_bytes.len() as u16);
        buf.put_slice(type_bytes);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse wire bytes back into an envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < 3 {
            return Err(EnvelopeError::Truncated {
                needed: 3,
                have: bytes.len(),
            });
        }
        if bytes[0] != WIRE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion { found: bytes[0] });
        }

        let type_len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        if type_len == 0 {
            return Err(EnvelopeError::EmptyEventType);
        }
        let header = 3 + type_len;
        if bytes.len() < header {
            return Err(EnvelopeError::Truncated {
                needed: header,
                have: bytes.len(),
            });
        }

        let event_type = std::str::from_utf8(&bytes[3..header])
            .map_err(|_| EnvelopeError::InvalidEventType)?
            .to_string();
        Ok(Self {
            event_type,
            payload: Bytes::copy_from_slice(&bytes[header..]),
        })
    }
}

/// Extract the declared event type from an inbound JSON payload.
///
/// The `"event"` field is required and must be a non-empty string; its
/// absence is a client error, not a codec failure.
pub fn event_type_of(payload: &[u8]) -> Result<String, IngestError> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|e| IngestError::MalformedJson {
            details: e.to_string().into(),
        })?;

    match value.get("event") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::String(_)) | Some(_) => {
            Err(IngestError::InvalidEventType)
        }
        None => Err(IngestError::MissingEventType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_type_and_payload() {
        let envelope =
            Envelope::new("click", &b"{\"event\":\"click\",\"url\":\"/x\"}"[..])
                .unwrap();
        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn roundtrip_with_empty_payload() {
        let envelope = Envelope::new("heartbeat", Bytes::new()).unwrap();
        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded.event_type, "heartbeat");
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn roundtrip_with_multibyte_event_type() {
        let envelope = Envelope::new("événement", &b"{}"[..]).unwrap();
        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded.event_type, "événement");
    }

    #[test]
    fn empty_event_type_is_rejected() {
        assert_eq!(
            Envelope::new("", Bytes::new()).unwrap_err(),
            EnvelopeError::EmptyEventType
        );
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert!(matches!(
            Envelope::decode(&[]),
            Err(EnvelopeError::Truncated { .. })
        ));

        // header says 5 type bytes, only 2 present
        let bytes = [WIRE_VERSION, 0, 5, b'c', b'l'];
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(EnvelopeError::Truncated { needed: 8, have: 5 })
        ));
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut bytes = Envelope::new("click", Bytes::new())
            .unwrap()
            .encode()
            .to_vec();
        bytes[0] = 9;
        assert_eq!(
            Envelope::decode(&bytes),
            Err(EnvelopeError::UnsupportedVersion { found: 9 })
        );
    }

    #[test]
    fn decode_rejects_invalid_utf8_type() {
        let bytes = [WIRE_VERSION, 0, 2, 0xff, 0xfe];
        assert_eq!(
            Envelope::decode(&bytes),
            Err(EnvelopeError::InvalidEventType)
        );
    }

    #[test]
    fn event_type_extraction() {
        assert_eq!(
            event_type_of(br#"{"event":"click","url":"/x"}"#).unwrap(),
            "click"
        );
        assert!(matches!(
            event_type_of(br#"{"url":"/x"}"#),
            Err(IngestError::MissingEventType)
        ));
        assert!(matches!(
            event_type_of(br#"{"event":42}"#),
            Err(IngestError::InvalidEventType)
        ));
        assert!(matches!(
            event_type_of(br#"{"event":""}"#),
            Err(IngestError::InvalidEventType)
        ));
        assert!(matches!(
            event_type_of(b"not json"),
            Err(IngestError::MalformedJson { .. })
        ));
    }
}
