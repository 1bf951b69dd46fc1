//! Canonical verifier for hardware attestation receipts.
//!
//! A node reports an execution as a receipt binding its hardware identity, its
//! firmware measurement, the execution hash and a replay counter under a
//! Keccak-256 digest. [`AnchorVerifier`] accepts a receipt only if the node is
//! authorized, the firmware is approved, the counter strictly exceeds the last
//! accepted one and the digest recomputes, and only then advances the counter.
//! Accepted receipts may be anchored by an external ledger submitter.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod receipt;
mod registry;
mod rejection;
mod types;
mod verifier;

pub use config::{AllowList, AllowListNode};
pub use error::{Error, HexError, Result};
pub use receipt::{AttestationReceipt, DOMAIN_TAG, RECEIPT_FIELDS, receipt_digest};
pub use registry::Registry;
pub use rejection::{Malformed, Rejection};
pub use types::{
    ExecutionHash, FirmwareMeasurement, HardwareIdentity, NodeRecord, ReceiptDigest,
    decode_bytes32,
};
pub use verifier::{AcceptedReceipt, AnchorVerifier, Outcome};
