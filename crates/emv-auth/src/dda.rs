//! Dynamic Data Authentication (EMV Book 2, section 6.5)

use emv_ca_keys::PublicKey;
use emv_common::{tags, Store, Tlv};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::message::{self, required, Format, Recovered};

/// ICC Dynamic Data from a recovered Signed Dynamic Application Data
pub(crate) fn icc_dynamic_data(recovered: &Recovered) -> Result<&[u8]> {
    // Header, format, hash algorithm indicator, Ldd
    let ldd = *recovered
        .data
        .get(3)
        .ok_or(AuthError::FormatInvalid("signed dynamic data too short"))?;

    recovered
        .data
        .get(4..4 + usize::from(ldd))
        .ok_or(AuthError::FormatInvalid("ICC dynamic data length exceeds the signature"))
}

/// ICC Dynamic Number, the length-prefixed start of the ICC Dynamic Data
pub(crate) fn dynamic_number(dynamic_data: &[u8]) -> Result<&[u8]> {
    let (&len, rest) = dynamic_data
        .split_first()
        .ok_or(AuthError::FormatInvalid("empty ICC dynamic data"))?;

    let len = usize::from(len);
    if !(2..=8).contains(&len) {
        return Err(AuthError::FormatInvalid("ICC dynamic number length"));
    }

    rest.get(..len)
        .ok_or(AuthError::FormatInvalid("ICC dynamic number exceeds the dynamic data"))
}

/// Verify the Signed Dynamic Application Data returned by INTERNAL
/// AUTHENTICATE and recover the ICC Dynamic Number.
///
/// `ddol_data` is the data sent with the command, built from the DDOL.
/// The ICC Dynamic Number is added to `store` as tag 9F4C.
pub fn verify_dda(store: &mut Store, icc_key: &PublicKey, ddol_data: &[u8]) -> Result<Vec<u8>> {
    let signed = required(store, tags::SIGNED_DYNAMIC_APPLICATION_DATA)?;
    let recovered = message::recover(icc_key, Format::SignedDynamicData, signed, &[ddol_data])?;
    let number = dynamic_number(icc_dynamic_data(&recovered)?)?.to_vec();

    debug!(idn = %hex::encode_upper(&number), "dynamic data authenticated");
    store.add(Tlv::new(tags::ICC_DYNAMIC_NUMBER, number.clone()));
    Ok(number)
}

/// Data objects of an INTERNAL AUTHENTICATE response.
///
/// A format 1 response (tag 80) holds nothing but the signature, which is
/// returned as tag 9F4B so both formats look alike to `verify_dda`.
pub fn parse_internal_authenticate(response: &[u8]) -> Result<Store> {
    let parsed = Store::parse(response)?;
    match parsed.roots() {
        [template] if template.tag() == tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1 => Ok(Store::from(vec![Tlv::new(
            tags::SIGNED_DYNAMIC_APPLICATION_DATA,
            template.value(),
        )])),
        [template] if template.tag() == tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2 => Ok(parsed),
        _ => Err(AuthError::FormatInvalid("INTERNAL AUTHENTICATE response template")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_number() {
        assert_eq!(dynamic_number(&[0x02, 0xAB, 0xCD, 0x40]), Ok(&[0xAB, 0xCD][..]));
        assert!(dynamic_number(&[]).is_err());
        assert!(dynamic_number(&[0x01, 0xAB]).is_err());
        assert!(dynamic_number(&[0x09, 1, 2, 3, 4, 5, 6, 7, 8, 9]).is_err());
        assert!(dynamic_number(&[0x04, 0xAB, 0xCD]).is_err());
    }

    #[test]
    fn test_parse_internal_authenticate_format_1() {
        let store = parse_internal_authenticate(&[0x80, 0x03, 0x01, 0x02, 0x03]).unwrap();
        assert_eq!(store.value(tags::SIGNED_DYNAMIC_APPLICATION_DATA), Some(&[0x01, 0x02, 0x03][..]));
    }

    #[test]
    fn test_parse_internal_authenticate_format_2() {
        let store = parse_internal_authenticate(&[0x77, 0x05, 0x9F, 0x4B, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(store.value(tags::SIGNED_DYNAMIC_APPLICATION_DATA), Some(&[0x01, 0x02][..]));
        assert!(parse_internal_authenticate(&[0x70, 0x00]).is_err());
    }
}
