//! Combined DDA / Application Cryptogram Generation (EMV Book 2, section 6.6)

use emv_ca_keys::PublicKey;
use emv_common::{tags, Store, Tlv};
use tracing::{debug, trace};

use crate::dda::{dynamic_number, icc_dynamic_data};
use crate::error::{AuthError, Result};
use crate::message::{self, required, Format};

/// Length of an Application Cryptogram
const CRYPTOGRAM_LEN: usize = 8;

/// Shortest ICC Dynamic Data a CDA signature may carry
const MIN_DYNAMIC_DATA_LEN: usize = 30;

/// Terminal data sent to the card during the transaction.
///
/// Each field is the command data exactly as sent, without the `83`
/// template of GET PROCESSING OPTIONS.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdaRequest<'a> {
    pub pdol_data: &'a [u8],
    pub cdol1_data: &'a [u8],
    /// Present when verifying the response to the second GENERATE AC
    pub cdol2_data: Option<&'a [u8]>,
}

/// What a verified CDA signature vouches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdaVerified {
    pub dynamic_number: Vec<u8>,
    pub cryptogram: [u8; CRYPTOGRAM_LEN],
    pub cryptogram_information: u8,
}

/// Verify the signature in a GENERATE AC response.
///
/// Checks run in this order: signature hash, cryptogram information and
/// cryptogram against the response, then the Transaction Data Hash Code.
///
/// # Arguments
/// * `store` - Transaction data holding the Unpredictable Number (9F37)
/// * `icc_key` - The recovered ICC public key
/// * `request` - Data sent with GET PROCESSING OPTIONS and GENERATE AC
/// * `response` - The format 2 GENERATE AC response body
///
/// # Returns
/// * `Ok(CdaVerified)` - The signed dynamic number and cryptogram. The ICC
///   Dynamic Number (9F4C) and, when the response did not carry it in
///   clear, the Application Cryptogram (9F26) are appended to `store`
/// * `Err(AuthError)` - If an input is missing or a check fails; `store`
///   is left untouched
pub fn verify_cda(
    store: &mut Store,
    icc_key: &PublicKey,
    request: &CdaRequest<'_>,
    response: &[u8],
) -> Result<CdaVerified> {
    let response = Store::parse(response)?;
    if !matches!(response.roots(), [template] if template.tag() == tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2) {
        return Err(AuthError::FormatInvalid("GENERATE AC response is not in format 2"));
    }

    let unpredictable_number = required(store, tags::UNPREDICTABLE_NUMBER)?;
    let cid = match required(&response, tags::CRYPTOGRAM_INFORMATION_DATA)? {
        &[cid] => cid,
        _ => return Err(AuthError::FormatInvalid("cryptogram information data length")),
    };
    let signed = required(&response, tags::SIGNED_DYNAMIC_APPLICATION_DATA)?;

    let recovered = message::recover(icc_key, Format::SignedDynamicData, signed, &[unpredictable_number])?;
    let dynamic_data = icc_dynamic_data(&recovered)?;
    let hash_len = recovered.hash_algorithm.output_len();
    if dynamic_data.len() < MIN_DYNAMIC_DATA_LEN {
        return Err(AuthError::FormatInvalid("ICC dynamic data too short for CDA"));
    }

    // IDN length, IDN, CID, cryptogram, transaction data hash code
    let number = dynamic_number(dynamic_data)?;
    let rest = &dynamic_data[1 + number.len()..];
    if rest.len() < 1 + CRYPTOGRAM_LEN + hash_len {
        return Err(AuthError::FormatInvalid("ICC dynamic data too short for CDA"));
    }
    let signed_cid = rest[0];
    let mut cryptogram = [0; CRYPTOGRAM_LEN];
    cryptogram.copy_from_slice(&rest[1..1 + CRYPTOGRAM_LEN]);
    let hash_code = &rest[1 + CRYPTOGRAM_LEN..1 + CRYPTOGRAM_LEN + hash_len];

    if signed_cid != cid {
        return Err(AuthError::CryptogramMismatch);
    }
    let clear_cryptogram = response.value(tags::APPLICATION_CRYPTOGRAM);
    if clear_cryptogram.is_some_and(|clear| clear != &cryptogram[..]) {
        return Err(AuthError::CryptogramMismatch);
    }

    let mut hasher = recovered.hash_algorithm.hasher();
    hasher.update(request.pdol_data);
    hasher.update(request.cdol1_data);
    if let Some(cdol2_data) = request.cdol2_data {
        hasher.update(cdol2_data);
    }
    for tlv in response.iter().filter(|tlv| !tlv.is_constructed()) {
        if tlv.tag() != tags::SIGNED_DYNAMIC_APPLICATION_DATA {
            trace!(tag = format_args!("{:02X}", tlv.tag()), "transaction data");
            hasher.update(&tlv.encode());
        }
    }
    if *hasher.finalize() != *hash_code {
        return Err(AuthError::DigestMismatch);
    }

    let verified = CdaVerified {
        dynamic_number: number.to_vec(),
        cryptogram,
        cryptogram_information: cid,
    };

    debug!(
        idn = %hex::encode_upper(&verified.dynamic_number),
        cid = format_args!("{cid:02X}"),
        "CDA signature verified"
    );

    if clear_cryptogram.is_none() {
        store.add(Tlv::new(tags::APPLICATION_CRYPTOGRAM, cryptogram.to_vec()));
    }
    store.add(Tlv::new(tags::ICC_DYNAMIC_NUMBER, verified.dynamic_number.clone()));
    Ok(verified)
}
