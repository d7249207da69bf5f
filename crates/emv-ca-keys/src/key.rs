//! EMV public key model shared by CA, issuer and ICC keys

use emv_common::{Expiry, HashAlgorithm};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

/// Key algorithm indicator for RSA (EMV Book 2, Annex B2)
pub const RSA_KEY_ALGORITHM: u8 = 0x01;

/// An RSA public key plus the EMV metadata that travels with it.
///
/// CA keys come from the registry. Issuer and ICC keys are produced by
/// certificate recovery and inherit the RID and CA index of the chain they
/// were recovered from; their certificate fields (identifier, expiry,
/// serial) are recorded here for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    rid: [u8; 5],
    index: u8,
    hash_algorithm: HashAlgorithm,
    key_algorithm: u8,
    expiry: Option<Expiry>,
    serial: Option<[u8; 3]>,
    identifier: Option<Vec<u8>>,
    key: RsaPublicKey,
}

impl PublicKey {
    /// Build a key from big-endian modulus and exponent bytes
    pub fn new(rid: [u8; 5], index: u8, modulus: &[u8], exponent: &[u8]) -> Result<Self, rsa::Error> {
        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )?;

        Ok(Self {
            rid,
            index,
            hash_algorithm: HashAlgorithm::Sha1,
            key_algorithm: RSA_KEY_ALGORITHM,
            expiry: None,
            serial: None,
            identifier: None,
            key,
        })
    }

    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    pub fn with_key_algorithm(mut self, key_algorithm: u8) -> Self {
        self.key_algorithm = key_algorithm;
        self
    }

    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_serial(mut self, serial: [u8; 3]) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Issuer identifier or PAN as recovered from the certificate
    pub fn with_identifier(mut self, identifier: Vec<u8>) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Registered Application Provider Identifier
    pub fn rid(&self) -> &[u8; 5] {
        &self.rid
    }

    /// CA public key index
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn key_algorithm(&self) -> u8 {
        self.key_algorithm
    }

    pub fn expiry(&self) -> Option<Expiry> {
        self.expiry
    }

    pub fn serial(&self) -> Option<&[u8; 3]> {
        self.serial.as_ref()
    }

    pub fn identifier(&self) -> Option<&[u8]> {
        self.identifier.as_deref()
    }

    /// Modulus as big-endian bytes, `modulus_len()` long
    pub fn modulus(&self) -> Vec<u8> {
        self.key.n().to_bytes_be()
    }

    pub fn exponent(&self) -> Vec<u8> {
        self.key.e().to_bytes_be()
    }

    /// Modulus length in bytes, the size of every block this key signs
    pub fn modulus_len(&self) -> usize {
        (self.key.n().bits() + 7) / 8
    }

    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }

    /// Whether the key expired before `as_of`; keys without an expiry never do
    pub fn is_expired(&self, as_of: Expiry) -> bool {
        self.expiry.is_some_and(|expiry| expiry.is_expired(as_of))
    }

    /// CA key check value: SHA-1 over RID, index, modulus and exponent
    pub fn check_value(&self) -> Vec<u8> {
        let index = [self.index];
        let modulus = self.modulus();
        let exponent = self.exponent();
        HashAlgorithm::Sha1.digest([&self.rid[..], &index, &modulus, &exponent])
    }
}
