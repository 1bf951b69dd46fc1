use thiserror::Error;

use crate::error::HexError;
use crate::types::{FirmwareMeasurement, HardwareIdentity};

/// Why a receipt could not be read at all.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Malformed {
    /// The envelope is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The envelope is valid JSON but not an object.
    #[error("receipt must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field outside the receipt format is present.
    #[error("unexpected field: {0}")]
    UnknownField(String),

    /// A byte field is not a JSON string.
    #[error("{0} must be a string")]
    NotAString(&'static str),

    /// A byte field is not `0x` followed by 32 bytes of hex.
    #[error("{field} {source}")]
    InvalidHex {
        /// The offending field.
        field: &'static str,

        /// What was wrong with it.
        source: HexError,
    },

    /// The counter is not an integer in `0..=u64::MAX`.
    #[error("invalid counter")]
    InvalidCounter,
}

/// Why a receipt was refused. Checks run in the order the variants are listed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    /// The receipt could not be parsed.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] Malformed),

    /// The hardware identity is not registered.
    #[error("unauthorized hardware identity {0}")]
    UnauthorizedIdentity(HardwareIdentity),

    /// The firmware measurement is not approved.
    #[error("unapproved firmware hash {0}")]
    UnapprovedFirmware(FirmwareMeasurement),

    /// The counter does not exceed the last accepted one.
    #[error("replay detected: counter {counter} is not greater than {last_counter}")]
    ReplayDetected {
        /// Counter carried by the receipt.
        counter: u64,

        /// Counter stored for the node when the check ran.
        last_counter: u64,
    },

    /// The recomputed digest disagrees with the claimed one.
    #[error("receipt digest mismatch")]
    DigestMismatch,
}

impl Rejection {
    /// Stable reason code for callers and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MalformedInput",
            Self::UnauthorizedIdentity(_) => "UnauthorizedIdentity",
            Self::UnapprovedFirmware(_) => "UnapprovedFirmware",
            Self::ReplayDetected { .. } => "ReplayDetected",
            Self::DigestMismatch => "DigestMismatch",
        }
    }
}
