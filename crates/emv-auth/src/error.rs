//! Failure reasons for offline data authentication

use std::fmt;

use emv_common::{Tag, TlvError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a certificate or signature was rejected.
///
/// `DigestMismatch` and `CryptogramMismatch` mean the card data was altered
/// or forged; the transaction must not be retried with the same data.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required data object is absent
    #[error("required data object {0:02X} is missing")]
    MissingInput(Tag),

    #[error("signed block is {actual} bytes, key modulus is {expected} bytes")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("no CA public key for RID {} index {index:02X}", hex::encode_upper(.rid))]
    UnknownParentKey { rid: [u8; 5], index: u8 },

    /// Recovered data does not start with 6A or end with BC
    #[error("recovered data has a bad header or trailer")]
    SentinelMismatch,

    #[error("malformed data: {0}")]
    FormatInvalid(&'static str),

    #[error("hash result does not match the recovered data")]
    DigestMismatch,

    #[error("certificate identifier does not match the application PAN")]
    PanMismatch,

    #[error("signed cryptogram differs from the card response")]
    CryptogramMismatch,

    #[error("public key exponent is malformed or not 3 or 65537")]
    ExponentOutOfRange,
}

impl From<TlvError> for AuthError {
    fn from(_: TlvError) -> Self {
        Self::FormatInvalid("undecodable BER-TLV data")
    }
}

// Tags, RIDs and key indexes read as hex
impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(tag) => write!(f, "MissingInput({tag:02X})"),
            Self::LengthMismatch { expected, actual } => f
                .debug_struct("LengthMismatch")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
            Self::UnknownParentKey { rid, index } => {
                write!(f, "UnknownParentKey {{ rid: {}, index: {index:02X} }}", hex::encode_upper(rid))
            }
            Self::SentinelMismatch => f.write_str("SentinelMismatch"),
            Self::FormatInvalid(what) => f.debug_tuple("FormatInvalid").field(what).finish(),
            Self::DigestMismatch => f.write_str("DigestMismatch"),
            Self::PanMismatch => f.write_str("PanMismatch"),
            Self::CryptogramMismatch => f.write_str("CryptogramMismatch"),
            Self::ExponentOutOfRange => f.write_str("ExponentOutOfRange"),
        }
    }
}
