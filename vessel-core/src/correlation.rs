//! Opaque correlation identifiers.
//!
//! Every call draws a fresh [`CorrelationId`]; the identifier travels as
//! transport metadata (never inside the envelope) and the server echoes it
//! back unchanged, which is what lets many uncoordinated clients share one
//! multiplexed channel and still pair each response with its own request.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 128-bit opaque correlation token.
///
/// Two random 64-bit halves; the display form is 32 hex digits. The token
/// carries no structure — equality is the only meaningful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId {
    hi: u64,
    lo: u64,
}

impl CorrelationId {
    /// Construct from explicit halves.
    pub const fn from_halves(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// Draw a fresh random identifier.
    pub fn fresh() -> Self {
        let mut rng = rand::rng();
        Self {
            hi: rng.random(),
            lo: rng.random(),
        }
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_32_hex_digits() {
        let id = CorrelationId::from_halves(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210);
        assert_eq!(id.to_string(), "0123456789abcdeffedcba9876543210");
    }

    #[test]
    fn fresh_ids_differ() {
        // Statistically certain for 128 random bits.
        assert_ne!(CorrelationId::fresh(), CorrelationId::fresh());
    }

    #[test]
    fn usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        let id = CorrelationId::fresh();
        map.insert(id, "pending");
        assert_eq!(map.remove(&id), Some("pending"));
        assert!(map.remove(&id).is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let id = CorrelationId::from_halves(42, 99);
        let json = serde_json::to_string(&id).expect("serialize");
        let decoded: CorrelationId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, decoded);
    }
}
