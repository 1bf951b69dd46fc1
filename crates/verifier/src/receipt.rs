//! Wire format and digest construction for attestation receipts.
//!
//! Firmware and verifier must agree bit-for-bit on the digest:
//!
//! ```text
//! keccak256( "anchor_RCT_V1"        13 bytes
//!          || hardware_identity     32 bytes
//!          || firmware_hash         32 bytes
//!          || execution_hash        32 bytes
//!          || counter               8 bytes, big endian )
//! ```

use std::collections::HashMap;

use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use sha3::{Digest, Keccak256};

use crate::error::HexError;
use crate::rejection::Malformed;
use crate::types::{ExecutionHash, FirmwareMeasurement, HardwareIdentity, ReceiptDigest};

/// Domain separation tag for version 1 of the receipt protocol.
pub const DOMAIN_TAG: &[u8; 13] = b"anchor_RCT_V1";

/// The fields a receipt must carry, and no others.
pub const RECEIPT_FIELDS: [&str; 5] = [
    "hardware_identity",
    "firmware_hash",
    "execution_hash",
    "receipt_digest",
    "counter",
];

/// Computes the digest a node must attach to a receipt.
#[must_use]
pub fn receipt_digest(
    hardware_identity: &HardwareIdentity,
    firmware_hash: &FirmwareMeasurement,
    execution_hash: &ExecutionHash,
    counter: u64,
) -> ReceiptDigest {
    let mut hasher = Keccak256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update(hardware_identity.as_bytes());
    hasher.update(firmware_hash.as_bytes());
    hasher.update(execution_hash.as_bytes());
    hasher.update(counter.to_be_bytes());

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());

    ReceiptDigest::new(digest)
}

/// A receipt as claimed by a remote node. Nothing in it is trusted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttestationReceipt {
    /// Claimed identity of the producing node.
    pub hardware_identity: HardwareIdentity,

    /// Claimed measurement of the firmware that ran.
    pub firmware_hash: FirmwareMeasurement,

    /// Hash of the execution being attested.
    pub execution_hash: ExecutionHash,

    /// Digest the node computed over the other fields.
    pub receipt_digest: ReceiptDigest,

    /// Replay counter; must exceed the last accepted one for this node.
    pub counter: u64,
}

impl AttestationReceipt {
    /// Builds a receipt with a correct digest, the way node firmware does.
    #[must_use]
    pub fn seal(
        hardware_identity: HardwareIdentity,
        firmware_hash: FirmwareMeasurement,
        execution_hash: ExecutionHash,
        counter: u64,
    ) -> Self {
        let receipt_digest =
            receipt_digest(&hardware_identity, &firmware_hash, &execution_hash, counter);

        Self {
            hardware_identity,
            firmware_hash,
            execution_hash,
            receipt_digest,
            counter,
        }
    }

    /// Parses the JSON wire format.
    ///
    /// The envelope must be an object with exactly the five [`RECEIPT_FIELDS`].
    ///
    /// # Errors
    ///
    /// Returns a [`Malformed`] describing the first structural problem found.
    pub fn from_json(input: &str) -> Result<Self, Malformed> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| Malformed::InvalidJson(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(Malformed::NotAnObject);
        };

        if let Some(missing) = RECEIPT_FIELDS
            .iter()
            .find(|name| !fields.contains_key(**name))
        {
            return Err(Malformed::MissingField(*missing));
        }

        if let Some(unknown) = fields
            .keys()
            .find(|key| !RECEIPT_FIELDS.contains(&key.as_str()))
        {
            return Err(Malformed::UnknownField(unknown.clone()));
        }

        Ok(Self {
            hardware_identity: bytes32_field(
                &fields,
                "hardware_identity",
                HardwareIdentity::from_hex,
            )?,
            firmware_hash: bytes32_field(&fields, "firmware_hash", FirmwareMeasurement::from_hex)?,
            execution_hash: bytes32_field(&fields, "execution_hash", ExecutionHash::from_hex)?,
            receipt_digest: bytes32_field(&fields, "receipt_digest", ReceiptDigest::from_hex)?,
            counter: counter_field(&fields, input)?,
        })
    }

    /// Renders the JSON wire format.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The digest this receipt should carry given its other fields.
    #[must_use]
    pub fn expected_digest(&self) -> ReceiptDigest {
        receipt_digest(
            &self.hardware_identity,
            &self.firmware_hash,
            &self.execution_hash,
            self.counter,
        )
    }
}

fn bytes32_field<T>(
    fields: &Map<String, Value>,
    field: &'static str,
    parse: fn(&str) -> Result<T, HexError>,
) -> Result<T, Malformed> {
    let text = fields
        .get(field)
        .and_then(Value::as_str)
        .ok_or(Malformed::NotAString(field))?;

    parse(text).map_err(|source| Malformed::InvalidHex { field, source })
}

/// JSON `-0` is the integer zero but serde_json decodes it as a float, so that
/// one spelling is checked against the raw text.
fn counter_field(fields: &Map<String, Value>, input: &str) -> Result<u64, Malformed> {
    if let Some(counter) = fields.get("counter").and_then(Value::as_u64) {
        return Ok(counter);
    }

    let negative_zero = serde_json::from_str::<HashMap<String, &RawValue>>(input)
        .ok()
        .and_then(|raw| raw.get("counter").map(|counter| counter.get() == "-0"))
        .unwrap_or(false);

    if negative_zero {
        Ok(0)
    } else {
        Err(Malformed::InvalidCounter)
    }
}
