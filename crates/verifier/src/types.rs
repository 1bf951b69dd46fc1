//! Fixed-size identifiers carried by receipts and held in the registry.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::HexError;

/// Decodes a `0x`-prefixed hex string (digits in any case) into exactly 32 bytes.
///
/// # Errors
///
/// Returns a [`HexError`] if the prefix is missing, the digits are not hex, or
/// the decoded value is not 32 bytes long.
pub fn decode_bytes32(value: &str) -> Result<[u8; 32], HexError> {
    let digits = value.strip_prefix("0x").ok_or(HexError::MissingPrefix)?;
    let raw = hex::decode(digits)?;
    let len = raw.len();

    <[u8; 32]>::try_from(raw).map_err(|_| HexError::WrongLength(len))
}

macro_rules! define_bytes32 {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wraps raw bytes.
            #[must_use]
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Parses a `0x`-prefixed hex string.
            ///
            /// # Errors
            ///
            /// Returns a [`HexError`] if the value is not `0x` followed by 32 bytes of hex.
            pub fn from_hex(value: &str) -> Result<Self, HexError> {
                decode_bytes32(value).map(Self)
            }

            /// Raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase `0x`-prefixed hex rendering.
            #[must_use]
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = HexError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::from_hex(value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }
    };
}

define_bytes32!(
    HardwareIdentity,
    "Identifies one physical or virtual node. Registry key."
);
define_bytes32!(
    FirmwareMeasurement,
    "Measurement (hash) of an approved firmware image."
);
define_bytes32!(
    ExecutionHash,
    "Hash of the execution a node claims to have performed."
);
define_bytes32!(
    ReceiptDigest,
    "Keccak-256 digest binding the fields of a receipt together."
);

/// Registry state for one authorized node.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NodeRecord {
    identity: HardwareIdentity,
    display_name: String,
    last_counter: u64,
}

impl NodeRecord {
    pub(crate) const fn new(identity: HardwareIdentity, display_name: String) -> Self {
        Self {
            identity,
            display_name,
            last_counter: 0,
        }
    }

    /// The node's hardware identity.
    #[must_use]
    pub const fn identity(&self) -> HardwareIdentity {
        self.identity
    }

    /// Human-readable name given at registration.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Counter of the most recently accepted receipt, or 0.
    #[must_use]
    pub const fn last_counter(&self) -> u64 {
        self.last_counter
    }

    /// Moves the counter forward. Callers must have checked monotonicity.
    pub(crate) fn advance(&mut self, counter: u64) {
        debug_assert!(counter > self.last_counter);
        self.last_counter = counter;
    }

    /// Administrative re-registration.
    pub(crate) fn reset(&mut self, display_name: String) {
        self.display_name = display_name;
        self.last_counter = 0;
    }
}
