//! Stateless payload deserializer handed to projectors (§4.3).

/// A stateless helper that decodes a stored event's payload bytes into a
/// JSON value. Kept object-safe (no generic method) so it can be held as
/// `&dyn Deserializer` throughout the projection path; callers deserialize
/// the returned value into their own concrete type with
/// `serde_json::from_value`.
pub trait Deserializer: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<serde_json::Value, serde_json::Error>;
}

/// The default `serde_json`-backed deserializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn decode(&self, payload: &[u8]) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, PartialEq, Debug)]
    struct Payload {
        amount: u32,
    }

    #[test]
    fn decodes_json() {
        let d = JsonDeserializer;
        let value = d.decode(br#"{"amount": 5}"#).unwrap();
        let out: Payload = serde_json::from_value(value).unwrap();
        assert_eq!(out, Payload { amount: 5 });
    }
}
