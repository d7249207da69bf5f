pub mod dump;
pub mod keys;
pub mod verify;

use emv_ca_keys::PublicKey;

use crate::formatters::FormatMode;

/// One line summary of a public key
pub(crate) fn describe_key(key: &PublicKey, mode: FormatMode) -> String {
    let mut summary = match mode {
        FormatMode::Raw => format!(
            "modulus {} exponent {}",
            hex::encode_upper(key.modulus()),
            hex::encode_upper(key.exponent())
        ),
        FormatMode::Human => format!("{} bits", key.modulus_len() * 8),
    };
    if let Some(expiry) = key.expiry() {
        summary.push_str(&format!(", expires {}", expiry));
    }
    summary
}
