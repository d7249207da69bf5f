//! Recovery of signed data with message recovery (EMV Book 2, Annex A2.1)

use emv_common::{HashAlgorithm, Store, Tag};
use tracing::trace;

use crate::error::{AuthError, Result};
use crate::primitive::ModPow;

/// First byte of every recovered message
pub const HEADER: u8 = 0x6A;

/// Last byte of every recovered message
pub const TRAILER: u8 = 0xBC;

/// Signed data format byte, the second byte of a recovered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Format {
    IssuerCertificate = 0x02,
    SignedStaticData = 0x03,
    IccCertificate = 0x04,
    SignedDynamicData = 0x05,
}

impl Format {
    /// Offset of the hash algorithm indicator in the recovered message
    fn hash_indicator_offset(self) -> usize {
        match self {
            Self::IssuerCertificate => 11,
            Self::IccCertificate => 17,
            Self::SignedStaticData | Self::SignedDynamicData => 2,
        }
    }
}

/// A verified message with its hash result and trailer removed
#[derive(Debug, Clone)]
pub(crate) struct Recovered {
    /// Header, format byte and payload
    pub data: Vec<u8>,
    pub hash_algorithm: HashAlgorithm,
}

/// Recover `signed` with `key` and check its framing and hash result.
///
/// The hash covers everything between the header and the hash result,
/// followed by `extra` in order.
pub(crate) fn recover<K>(key: &K, format: Format, signed: &[u8], extra: &[&[u8]]) -> Result<Recovered>
where
    K: ModPow + ?Sized,
{
    let expected = key.modulus_len();
    if signed.len() != expected {
        return Err(AuthError::LengthMismatch {
            expected,
            actual: signed.len(),
        });
    }

    let mut data = key.mod_pow(signed);
    trace!(format = ?format, recovered = %hex::encode_upper(&data), "recovered message");

    if data.first() != Some(&HEADER) || data.last() != Some(&TRAILER) {
        return Err(AuthError::SentinelMismatch);
    }
    if data[1] != format as u8 {
        return Err(AuthError::FormatInvalid("unexpected signed data format"));
    }

    let offset = format.hash_indicator_offset();
    let indicator = *data
        .get(offset)
        .ok_or(AuthError::FormatInvalid("recovered message too short"))?;
    let hash_algorithm =
        HashAlgorithm::from_indicator(indicator).ok_or(AuthError::FormatInvalid("unknown hash algorithm indicator"))?;

    // The hash result must not overlap the indicator
    let hash_len = hash_algorithm.output_len();
    if data.len() < offset + hash_len + 2 {
        return Err(AuthError::FormatInvalid("recovered message too short"));
    }
    let hash_start = data.len() - 1 - hash_len;

    let mut parts = vec![&data[1..hash_start]];
    parts.extend_from_slice(extra);
    if hash_algorithm.digest(parts) != data[hash_start..data.len() - 1] {
        return Err(AuthError::DigestMismatch);
    }

    data.truncate(hash_start);
    Ok(Recovered { data, hash_algorithm })
}

/// Value of a tag that must be present
pub(crate) fn required(store: &Store, tag: Tag) -> Result<&[u8]> {
    store.value(tag).ok_or(AuthError::MissingInput(tag))
}
