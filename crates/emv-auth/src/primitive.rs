//! Raw RSA public operation used for message recovery

use emv_ca_keys::PublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

/// `input ^ e mod n` with no padding scheme applied.
///
/// Input and output are big-endian unsigned integers. The output is always
/// left padded with zeros to `modulus_len()` bytes.
pub trait ModPow {
    /// Modulus length in bytes
    fn modulus_len(&self) -> usize;

    fn mod_pow(&self, input: &[u8]) -> Vec<u8>;
}

impl ModPow for RsaPublicKey {
    fn modulus_len(&self) -> usize {
        (self.n().bits() + 7) / 8
    }

    fn mod_pow(&self, input: &[u8]) -> Vec<u8> {
        let len = self.modulus_len();
        if len == 0 {
            return Vec::new();
        }

        let recovered = BigUint::from_bytes_be(input).modpow(self.e(), self.n());
        left_pad(recovered.to_bytes_be(), len)
    }
}

impl ModPow for PublicKey {
    fn modulus_len(&self) -> usize {
        PublicKey::modulus_len(self)
    }

    fn mod_pow(&self, input: &[u8]) -> Vec<u8> {
        self.rsa().mod_pow(input)
    }
}

fn left_pad(bytes: Vec<u8>, len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes;
    }

    let mut padded = vec![0; len - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}
