//! Recovery of issuer and ICC public keys from their certificates
//! (EMV Book 2, sections 5.3, 6.3 and 6.4)

use emv_ca_keys::key::RSA_KEY_ALGORITHM;
use emv_ca_keys::PublicKey;
use emv_common::{tags, Expiry, Store, Tag};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::message::{self, required, Format};

/// Which certificate in the chain is being recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Issuer,
    Icc,
    IccPinEncipherment,
}

impl CertificateKind {
    fn format(self) -> Format {
        match self {
            Self::Issuer => Format::IssuerCertificate,
            Self::Icc | Self::IccPinEncipherment => Format::IccCertificate,
        }
    }

    /// Length of the issuer identifier or PAN field
    fn identifier_len(self) -> usize {
        match self {
            Self::Issuer => 4,
            Self::Icc | Self::IccPinEncipherment => 10,
        }
    }

    /// Certificate, exponent and remainder tags
    fn tags(self) -> (Tag, Tag, Tag) {
        match self {
            Self::Issuer => (
                tags::ISSUER_PUBLIC_KEY_CERTIFICATE,
                tags::ISSUER_PUBLIC_KEY_EXPONENT,
                tags::ISSUER_PUBLIC_KEY_REMAINDER,
            ),
            Self::Icc => (
                tags::ICC_PUBLIC_KEY_CERTIFICATE,
                tags::ICC_PUBLIC_KEY_EXPONENT,
                tags::ICC_PUBLIC_KEY_REMAINDER,
            ),
            Self::IccPinEncipherment => (
                tags::ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_CERTIFICATE,
                tags::ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_EXPONENT,
                tags::ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_REMAINDER,
            ),
        }
    }
}

/// Recover the issuer public key with a CA public key
///
/// # Arguments
/// * `store` - Card data holding the Issuer Public Key Certificate (90),
///   Exponent (9F32), Remainder (92) when present, and the PAN (5A)
/// * `ca_key` - The CA public key named by the card (8F)
///
/// # Returns
/// * `Ok(PublicKey)` - The issuer key, carrying the RID and CA index of `ca_key`
/// * `Err(AuthError)` - If an input is missing or the certificate is rejected
///
/// # Example
/// ```
/// use emv_auth::{recover_issuer_key, AuthError};
/// use emv_ca_keys::KeyRegistry;
/// use emv_common::{tags, Store};
///
/// let registry = KeyRegistry::embedded();
/// let ca_key = registry.lookup(&[0xA0, 0x00, 0x00, 0x00, 0x03], 0x92).unwrap();
///
/// let err = recover_issuer_key(&Store::new(), ca_key).unwrap_err();
/// assert_eq!(err, AuthError::MissingInput(tags::ISSUER_PUBLIC_KEY_CERTIFICATE));
/// ```
pub fn recover_issuer_key(store: &Store, ca_key: &PublicKey) -> Result<PublicKey> {
    recover_key(CertificateKind::Issuer, store, ca_key, &[])
}

/// Recover the ICC public key with the issuer public key.
///
/// `static_data` is the static data to be authenticated, which the ICC
/// certificate hash covers.
pub fn recover_icc_key(store: &Store, issuer_key: &PublicKey, static_data: &[u8]) -> Result<PublicKey> {
    recover_key(CertificateKind::Icc, store, issuer_key, static_data)
}

/// Recover the ICC PIN encipherment public key with the issuer public key
pub fn recover_icc_pe_key(store: &Store, issuer_key: &PublicKey) -> Result<PublicKey> {
    recover_key(CertificateKind::IccPinEncipherment, store, issuer_key, &[])
}

/// Recover a public key from its certificate.
///
/// The recovered key inherits the RID and CA index of `parent` and carries
/// the certificate's identifier, expiry, serial number and hash algorithm.
/// Certificate expiry is not checked against the current date.
pub fn recover_key(kind: CertificateKind, store: &Store, parent: &PublicKey, extra: &[u8]) -> Result<PublicKey> {
    let (certificate_tag, exponent_tag, remainder_tag) = kind.tags();
    let certificate = required(store, certificate_tag)?;
    let exponent = required(store, exponent_tag)?;
    let pan = required(store, tags::APPLICATION_PAN)?;
    let remainder = store.value(remainder_tag).unwrap_or_default();

    let recovered = message::recover(parent, kind.format(), certificate, &[remainder, exponent, extra])?;
    let data = &recovered.data;

    // Header, format, identifier, expiry (2), serial (3), hash algorithm,
    // key algorithm, key length and exponent length
    let id_len = kind.identifier_len();
    let fixed_len = 2 + id_len + 9;
    if data.len() < fixed_len {
        return Err(AuthError::FormatInvalid("certificate too short"));
    }

    let identifier = &data[2..2 + id_len];
    let expiry = &data[2 + id_len..4 + id_len];
    let serial = [data[4 + id_len], data[5 + id_len], data[6 + id_len]];
    let key_algorithm = data[8 + id_len];
    let key_len = usize::from(data[9 + id_len]);
    let exponent_len = usize::from(data[10 + id_len]);
    let leftmost = &data[fixed_len..];

    if key_algorithm != RSA_KEY_ALGORITHM {
        return Err(AuthError::FormatInvalid("unsupported public key algorithm"));
    }
    if key_len == 0 || key_len > parent.modulus_len() {
        return Err(AuthError::FormatInvalid("declared key length exceeds the parent key"));
    }

    check_exponent(exponent, exponent_len)?;
    let modulus = assemble_modulus(leftmost, remainder, key_len, remainder_tag)?;
    check_identifier(kind, identifier, pan)?;
    let expiry = Expiry::from_mmyy(expiry).ok_or(AuthError::FormatInvalid("certificate expiration date"))?;

    let key = PublicKey::new(*parent.rid(), parent.index(), &modulus, exponent)
        .map_err(|_| AuthError::FormatInvalid("recovered public key"))?
        .with_hash_algorithm(recovered.hash_algorithm)
        .with_key_algorithm(key_algorithm)
        .with_expiry(expiry)
        .with_serial(serial)
        .with_identifier(identifier.to_vec());

    debug!(
        kind = ?kind,
        modulus_len = key_len,
        serial = %hex::encode_upper(serial),
        "recovered public key, expires {expiry}"
    );

    Ok(key)
}

/// Exponent must be 3 or 65537, sent in exactly the declared length
fn check_exponent(exponent: &[u8], declared_len: usize) -> Result<()> {
    if exponent.len() != declared_len || !(1..=3).contains(&declared_len) {
        return Err(AuthError::ExponentOutOfRange);
    }

    let value = exponent.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    match value {
        3 | 65537 => Ok(()),
        _ => Err(AuthError::ExponentOutOfRange),
    }
}

/// Join the leftmost digits carried in the certificate with the remainder.
///
/// When the whole key fits in the certificate the trailing `BB` padding is
/// cut off; otherwise the remainder supplies the rest of the key.
fn assemble_modulus(leftmost: &[u8], remainder: &[u8], key_len: usize, remainder_tag: Tag) -> Result<Vec<u8>> {
    let mut modulus = if key_len <= leftmost.len() {
        leftmost[..key_len].to_vec()
    } else {
        if remainder.is_empty() {
            return Err(AuthError::MissingInput(remainder_tag));
        }
        let mut modulus = Vec::with_capacity(leftmost.len() + remainder.len());
        modulus.extend_from_slice(leftmost);
        modulus.extend_from_slice(remainder);
        modulus
    };

    if modulus.len() < key_len {
        return Err(AuthError::FormatInvalid("public key remainder too short"));
    }
    modulus.truncate(key_len);

    // A usable modulus has exactly the declared length and is odd
    if modulus[0] == 0 || modulus[key_len - 1] & 0x01 == 0 {
        return Err(AuthError::FormatInvalid("recovered modulus"));
    }

    Ok(modulus)
}

/// BCD digits up to the first `F` nibble
fn digits(bcd: &[u8]) -> Vec<u8> {
    bcd.iter()
        .flat_map(|b| [b >> 4, b & 0x0F])
        .take_while(|&nibble| nibble != 0x0F)
        .collect()
}

/// Issuer identifiers must prefix the PAN, ICC certificates must name it
fn check_identifier(kind: CertificateKind, identifier: &[u8], pan: &[u8]) -> Result<()> {
    let identifier = digits(identifier);
    let pan = digits(pan);

    let matches = match kind {
        CertificateKind::Issuer => {
            if !(3..=8).contains(&identifier.len()) {
                return Err(AuthError::FormatInvalid("issuer identifier length"));
            }
            pan.starts_with(&identifier)
        }
        CertificateKind::Icc | CertificateKind::IccPinEncipherment => !identifier.is_empty() && identifier == pan,
    };

    if matches {
        Ok(())
    } else {
        Err(AuthError::PanMismatch)
    }
}
