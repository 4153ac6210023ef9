//! Fixed-size, hex-rendered primitive identifiers.
//!
//! `Address`, `Hash`, and `Signature` are opaque byte strings. They
//! `Display` as lowercase hex and (de)serialize as hex strings over serde,
//! so JSON/YAML config and API payloads stay human-readable while the wire
//! codec ([`crate::codec`]) still sees raw bytes.

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length in bytes of an opaque [`Address`].
pub const ADDRESS_LEN: usize = 20;
/// Length in bytes of a [`Hash`] (a SHA-256 digest).
pub const HASH_LEN: usize = 32;
/// Length in bytes of a [`Signature`] (Ed25519).
pub const SIGNATURE_LEN: usize = 64;

macro_rules! fixed_bytes {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// All-zero value, used for genesis `prev_hash` and similar sentinels.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Raw byte view.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Build from a byte slice, failing if the length is wrong.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                if bytes.len() != $len {
                    return None;
                }
                let mut buf = [0u8; $len];
                buf.copy_from_slice(bytes);
                Some(Self(buf))
            }

            /// Lowercase hex rendering (no `0x` prefix).
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from a lowercase or uppercase hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                Self::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(DeError::custom)
            }
        }
    };
}

fixed_bytes!(Address, ADDRESS_LEN, "A 20-byte account/validator identifier.");
fixed_bytes!(Hash, HASH_LEN, "A 32-byte SHA-256 digest.");
fixed_bytes!(Signature, SIGNATURE_LEN, "A 64-byte Ed25519 signature.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let a = Address([7u8; ADDRESS_LEN]);
        let hex = a.to_hex();
        assert_eq!(Address::from_hex(&hex).unwrap(), a);
    }

    #[test]
    fn serde_round_trip() {
        let h = Hash([9u8; HASH_LEN]);
        let json = serde_json::to_string(&h).unwrap();
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn zero_is_default() {
        assert_eq!(Hash::default(), Hash::ZERO);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::from_slice(&[0u8; 5]).is_none());
    }
}
