//! EMV CA Keys - Certificate Authority public key management
//!
//! This crate provides the registry of CA public keys used as the root of
//! every EMV certificate chain. A registry is built once, is immutable
//! afterwards and is shared by reference between transactions.

pub mod key;

use std::fs;
use std::path::Path;

use emv_common::Expiry;
use thiserror::Error;
use tracing::{debug, warn};

pub use key::PublicKey;

/// CA key table bundled with the crate
const EMBEDDED_CA_KEYS: &str = include_str!("../../../ca-public-keys.txt");

/// Failure to read a CA key table
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read CA key table: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
enum LineError {
    #[error("expected at least 5 tab separated columns, found {0}")]
    Columns(usize),
    #[error("invalid hex in {0} column")]
    Hex(&'static str),
    #[error("RID must be 5 bytes")]
    Rid,
    #[error("index must be 1 byte")]
    Index,
    #[error("invalid key length column")]
    KeyLengthColumn,
    #[error("declared key length {declared} bits, modulus has {actual}")]
    KeyLength { declared: usize, actual: usize },
    #[error("check value mismatch")]
    CheckValue,
    #[error("invalid expiry date")]
    Expiry,
    #[error("invalid RSA key: {0}")]
    Rsa(#[from] rsa::Error),
}

/// One registry entry: the key and the payment scheme it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaKey {
    pub scheme: String,
    pub key: PublicKey,
}

/// Table of CA public keys indexed by (RID, index)
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    entries: Vec<CaKey>,
}

impl KeyRegistry {
    /// Registry built from the bundled `ca-public-keys.txt`
    pub fn embedded() -> Self {
        Self::parse(EMBEDDED_CA_KEYS)
    }

    /// Load a CA key table from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&text))
    }

    /// Parse a CA key table.
    ///
    /// One key per line, tab separated:
    /// `Scheme  Exponent  Index  RID  Modulus  [KeyLength  [CheckValue  [Expiry]]]`
    /// with hex coded binary columns, the key length in bits and the expiry
    /// as `YYMMDD`. Empty and `#` lines are ignored. Lines that fail to parse
    /// or whose check value does not match are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();

        for (number, line) in text.lines().enumerate() {
            // Skip empty lines and comments
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Ok(entry) => {
                    debug!(
                        rid = %hex::encode_upper(entry.key.rid()),
                        index = entry.key.index(),
                        "loaded {} CA key",
                        entry.scheme
                    );
                    entries.push(entry);
                }
                Err(err) => warn!(line = number + 1, "skipping CA key: {err}"),
            }
        }

        Self { entries }
    }

    /// Registry holding exactly `keys`, for private or test key sets
    pub fn from_keys(keys: impl IntoIterator<Item = CaKey>) -> Self {
        Self {
            entries: keys.into_iter().collect(),
        }
    }

    /// Get the CA public key for a RID and CA public key index
    ///
    /// # Arguments
    /// * `rid` - Registered Application Provider Identifier (5 bytes)
    /// * `index` - CA Public Key Index (tag 8F)
    ///
    /// # Returns
    /// * `Some(&PublicKey)` - The CA public key if registered
    /// * `None` - If no matching key is found
    ///
    /// # Example
    /// ```
    /// use emv_ca_keys::KeyRegistry;
    ///
    /// let registry = KeyRegistry::embedded();
    ///
    /// // Visa RID with CA index 92
    /// let rid = &[0xA0, 0x00, 0x00, 0x00, 0x03];
    /// let key = registry.lookup(rid, 0x92).unwrap();
    /// assert_eq!(key.modulus_len(), 176);
    ///
    /// assert!(registry.lookup(rid, 0x00).is_none());
    /// ```
    pub fn lookup(&self, rid: &[u8], index: u8) -> Option<&PublicKey> {
        self.entries
            .iter()
            .map(|entry| &entry.key)
            .find(|key| key.rid()[..] == *rid && key.index() == index)
    }

    /// All keys registered for a RID
    pub fn keys_for_rid<'a>(&'a self, rid: &'a [u8]) -> impl Iterator<Item = &'a CaKey> + 'a {
        self.entries.iter().filter(move |entry| entry.key.rid()[..] == *rid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaKey> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Result<CaKey, LineError> {
    let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
    if parts.len() < 5 {
        return Err(LineError::Columns(parts.len()));
    }

    let decode = |column: &'static str, text: &str| hex::decode(text).map_err(|_| LineError::Hex(column));

    let exponent = decode("exponent", parts[1])?;
    let index = match decode("index", parts[2])?.as_slice() {
        [index] => *index,
        _ => return Err(LineError::Index),
    };
    let rid: [u8; 5] = decode("RID", parts[3])?
        .try_into()
        .map_err(|_| LineError::Rid)?;
    let modulus = decode("modulus", parts[4])?;

    let mut key = PublicKey::new(rid, index, &modulus, &exponent)?;

    if let Some(bits) = parts.get(5).filter(|text| !text.is_empty()) {
        let declared = bits.parse::<usize>().map_err(|_| LineError::KeyLengthColumn)?;
        let actual = key.modulus_len() * 8;
        if declared != actual {
            return Err(LineError::KeyLength { declared, actual });
        }
    }

    if let Some(check) = parts.get(6).filter(|text| !text.is_empty()) {
        if decode("check value", *check)? != key.check_value() {
            return Err(LineError::CheckValue);
        }
    }

    if let Some(date) = parts.get(7).filter(|text| !text.is_empty()) {
        let expiry = Expiry::from_yymmdd(&decode("expiry", *date)?).ok_or(LineError::Expiry)?;
        key = key.with_expiry(expiry);
    }

    Ok(CaKey {
        scheme: parts[0].to_string(),
        key,
    })
}

/// Common RIDs for major payment schemes
pub mod rids {
    /// Visa RID
    pub const VISA: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03];

    /// Mastercard RID
    pub const MASTERCARD: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x04];

    /// American Express RID
    pub const AMEX: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x25];

    /// Discover RID
    pub const DISCOVER: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x52];

    /// JCB RID
    pub const JCB: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x65];

    /// UnionPay RID
    pub const UNIONPAY: &[u8] = &[0xA0, 0x00, 0x00, 0x03, 0x33];
}
