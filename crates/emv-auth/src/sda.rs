//! Static Data Authentication (EMV Book 2, section 5.4)

use emv_ca_keys::PublicKey;
use emv_common::{tags, Store, Tlv};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::message::{self, required, Format};

/// Verify the Signed Static Application Data and recover the Data
/// Authentication Code.
///
/// The DAC is added to `store` as tag 9F45.
pub fn recover_dac(store: &mut Store, issuer_key: &PublicKey, static_data: &[u8]) -> Result<[u8; 2]> {
    let signed = required(store, tags::SIGNED_STATIC_APPLICATION_DATA)?;
    let recovered = message::recover(issuer_key, Format::SignedStaticData, signed, &[static_data])?;

    // Header, format, hash algorithm indicator, DAC
    let dac = match recovered.data.get(3..5) {
        Some(&[a, b]) => [a, b],
        _ => return Err(AuthError::FormatInvalid("signed static data too short")),
    };

    debug!(dac = %hex::encode_upper(dac), "static data authenticated");
    store.add(Tlv::new(tags::DATA_AUTHENTICATION_CODE, dac.to_vec()));
    Ok(dac)
}
