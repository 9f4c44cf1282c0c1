//! Section 6 wire formats.
//!
//! Every wire type in this crate ([`crate::okvs::Okvs`],
//! [`crate::placement::PlacementTable`], [`crate::placement::Share`],
//! [`crate::field::Field`]) is `serde`-derived, so the same type round-trips
//! through two representations without a bespoke encoder for each:
//!
//! * a human-debuggable JSON form ([`to_json`]/[`from_json`]), used by the
//!   CLI demonstrator for its input-set file and for snapshotting recovered
//!   witnesses;
//! * a canonical binary form ([`to_binary`]/[`from_binary`]) for the
//!   OKVS-publication and placement-table wire formats, backed by CBOR --
//!   the same codec the reference transport uses for its websocket wire
//!   messages.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serializes `value` to its canonical binary wire form (CBOR).
pub fn to_binary<T: Serialize>(value: &T) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)?;
    Ok(buf)
}

/// Deserializes `bytes` from the canonical binary wire form (CBOR).
pub fn from_binary<T: DeserializeOwned>(
    bytes: &[u8],
) -> Result<T, ciborium::de::Error<std::io::Error>> {
    ciborium::from_reader(bytes)
}

/// Serializes `value` to its human-debuggable JSON wire form.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Deserializes `json` from the human-debuggable JSON wire form.
pub fn from_json<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::hash_to_field;
    use crate::placement::Share;

    #[test]
    fn binary_round_trip_preserves_a_share() {
        let share = Share {
            party_id: 3,
            fx_i: hash_to_field(1),
            tag: hash_to_field(2),
        };
        let bytes = to_binary(&share).unwrap();
        let decoded: Share = from_binary(&bytes).unwrap();
        assert_eq!(decoded, share);
    }

    #[test]
    fn json_round_trip_preserves_a_share() {
        let share = Share {
            party_id: 7,
            fx_i: hash_to_field(10),
            tag: hash_to_field(20),
        };
        let json = to_json(&share).unwrap();
        let decoded: Share = from_json(&json).unwrap();
        assert_eq!(decoded, share);
    }
}
