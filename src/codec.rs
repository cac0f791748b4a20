// Copyright 2025 Cowboy AI, LLC.

//! Payload encoding helpers
//!
//! The registry treats payloads as opaque bytes. These helpers give callers and
//! the derived-promise components one agreed encoding for typed values, for the
//! ordered output of an aggregate, and for the marker a callback is rejected
//! with when its parent settled the other way.

use crate::errors::PromiseResult;
use crate::promise::PromiseStatus;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Marker string carried by every "not applicable" callback rejection
pub const NOT_APPLICABLE_MARKER: &str = "callback-not-applicable";

/// Encode a typed value as a payload
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> PromiseResult<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Decode a payload produced by [`encode_value`]
pub fn decode_value<T: DeserializeOwned>(payload: &[u8]) -> PromiseResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

/// Encode an ordered sequence of payloads
pub fn encode_sequence(items: &[Bytes]) -> PromiseResult<Bytes> {
    let raw: Vec<&[u8]> = items.iter().map(|b| b.as_ref()).collect();
    encode_value(&raw)
}

/// Decode a sequence produced by [`encode_sequence`]
pub fn decode_sequence(payload: &[u8]) -> PromiseResult<Vec<Bytes>> {
    let raw: Vec<Vec<u8>> = decode_value(payload)?;
    Ok(raw.into_iter().map(Bytes::from).collect())
}

/// Rejection payload for a callback whose parent settled the other way
///
/// The parent's own status and payload are embedded so the rejection can be
/// diagnosed without going back to the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotApplicable {
    /// Always [`NOT_APPLICABLE_MARKER`]
    pub marker: String,
    /// How the parent actually settled
    pub parent_status: PromiseStatus,
    /// The parent's payload
    pub parent_payload: Vec<u8>,
}

/// Build the "not applicable" rejection payload
pub fn encode_not_applicable(parent_status: PromiseStatus, parent_payload: &[u8]) -> PromiseResult<Bytes> {
    encode_value(&NotApplicable {
        marker: NOT_APPLICABLE_MARKER.to_string(),
        parent_status,
        parent_payload: parent_payload.to_vec(),
    })
}

/// Recognise a "not applicable" rejection payload
///
/// Returns `None` for any payload that is not such a marker, including
/// target failures.
pub fn decode_not_applicable(payload: &[u8]) -> Option<NotApplicable> {
    decode_value::<NotApplicable>(payload)
        .ok()
        .filter(|n| n.marker == NOT_APPLICABLE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sequence_preserves_order_and_empty_items() {
        let items = vec![Bytes::from_static(b"a"), Bytes::new(), Bytes::from_static(b"ccc")];
        let encoded = encode_sequence(&items).unwrap();
        assert_eq!(decode_sequence(&encoded).unwrap(), items);
    }

    #[test]
    fn test_not_applicable_marker() {
        let payload = encode_not_applicable(PromiseStatus::Rejected, b"boom").unwrap();
        let marker = decode_not_applicable(&payload).unwrap();
        assert_eq!(marker.parent_status, PromiseStatus::Rejected);
        assert_eq!(marker.parent_payload, b"boom".to_vec());

        assert!(decode_not_applicable(b"plain revert").is_none());
        assert!(decode_not_applicable(&encode_value(&42u64).unwrap()).is_none());
    }
}
