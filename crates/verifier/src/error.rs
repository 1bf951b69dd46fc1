use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised on the trusted admin path.
///
/// Receipt verification never returns this type; see [`crate::Rejection`].
#[derive(Debug, Error)]
pub enum Error {
    /// An admin-supplied 32-byte value could not be decoded.
    #[error("{field} is malformed: {source}")]
    MalformedInput {
        /// Name of the offending value.
        field: &'static str,

        /// Why decoding failed.
        #[source]
        source: HexError,
    },

    /// The allow-list file could not be read or parsed.
    #[error("allow-list error: {0}")]
    Config(String),
}

/// Failure decoding a `0x`-prefixed 32-byte hex string.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HexError {
    /// The value does not start with `0x`.
    #[error("must be 0x-prefixed hex")]
    MissingPrefix,

    /// The digits after the prefix are not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The value decoded to the wrong number of bytes.
    #[error("must be 32 bytes, got {0}")]
    WrongLength(usize),
}
