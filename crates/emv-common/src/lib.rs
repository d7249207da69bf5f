//! EMV Common - Shared data structures and utilities for EMV processing

pub mod date;
pub mod digest;
pub mod tlv;

pub use date::Expiry;
pub use digest::HashAlgorithm;
pub use tlv::{parse_tag_list, Store, Tag, Tlv, TlvError, Walk};

/// Common EMV tags used in offline data authentication
pub mod tags {
    use super::Tag;

    // Application selection
    pub const APPLICATION_IDENTIFIER: Tag = 0x4F;
    pub const DEDICATED_FILE_NAME: Tag = 0x84;
    pub const FCI_TEMPLATE: Tag = 0x6F;
    pub const FCI_PROPRIETARY_TEMPLATE: Tag = 0xA5;
    pub const PDOL: Tag = 0x9F38;

    // Application data
    pub const APPLICATION_PAN: Tag = 0x5A;
    pub const APPLICATION_EXPIRATION_DATE: Tag = 0x5F24;
    pub const AIP: Tag = 0x82;
    pub const AFL: Tag = 0x94;
    pub const CDOL1: Tag = 0x8C;
    pub const CDOL2: Tag = 0x8D;
    pub const DDOL: Tag = 0x9F49;

    // Certificates and keys
    pub const CA_PUBLIC_KEY_INDEX: Tag = 0x8F;
    pub const ISSUER_PUBLIC_KEY_CERTIFICATE: Tag = 0x90;
    pub const ISSUER_PUBLIC_KEY_REMAINDER: Tag = 0x92;
    pub const ISSUER_PUBLIC_KEY_EXPONENT: Tag = 0x9F32;
    pub const ICC_PUBLIC_KEY_CERTIFICATE: Tag = 0x9F46;
    pub const ICC_PUBLIC_KEY_EXPONENT: Tag = 0x9F47;
    pub const ICC_PUBLIC_KEY_REMAINDER: Tag = 0x9F48;
    pub const ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_CERTIFICATE: Tag = 0x9F2D;
    pub const ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_EXPONENT: Tag = 0x9F2E;
    pub const ICC_PIN_ENCIPHERMENT_PUBLIC_KEY_REMAINDER: Tag = 0x9F2F;
    pub const STATIC_DATA_AUTHENTICATION_TAG_LIST: Tag = 0x9F4A;

    // Signed data
    pub const SIGNED_STATIC_APPLICATION_DATA: Tag = 0x93;
    pub const DATA_AUTHENTICATION_CODE: Tag = 0x9F45;
    pub const SIGNED_DYNAMIC_APPLICATION_DATA: Tag = 0x9F4B;
    pub const ICC_DYNAMIC_NUMBER: Tag = 0x9F4C;

    // GENERATE AC
    pub const APPLICATION_CRYPTOGRAM: Tag = 0x9F26;
    pub const CRYPTOGRAM_INFORMATION_DATA: Tag = 0x9F27;
    pub const APPLICATION_TRANSACTION_COUNTER: Tag = 0x9F36;
    pub const ISSUER_APPLICATION_DATA: Tag = 0x9F10;
    pub const UNPREDICTABLE_NUMBER: Tag = 0x9F37;

    // Response templates
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_1: Tag = 0x80;
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_2: Tag = 0x77;
    pub const RECORD_TEMPLATE: Tag = 0x70;
}

/// Get a human-readable name for an EMV tag
pub fn get_tag_name(tag: Tag) -> &'static str {
    match tag {
        0x4F => "Application Identifier (AID)",
        0x50 => "Application Label",
        0x57 => "Track 2 Equivalent Data",
        0x5A => "Application PAN",
        0x5F20 => "Cardholder Name",
        0x5F24 => "Application Expiration Date",
        0x5F25 => "Application Effective Date",
        0x5F28 => "Issuer Country Code",
        0x5F2A => "Transaction Currency Code",
        0x5F34 => "Application PAN Sequence Number",
        0x6F => "File Control Information Template",
        0x70 => "Record Template",
        0x77 => "Response Message Template Format 2",
        0x80 => "Response Message Template Format 1",
        0x82 => "Application Interchange Profile",
        0x84 => "Dedicated File Name",
        0x8C => "CDOL1",
        0x8D => "CDOL2",
        0x8F => "CA Public Key Index",
        0x90 => "Issuer Public Key Certificate",
        0x92 => "Issuer Public Key Remainder",
        0x93 => "Signed Static Application Data",
        0x94 => "Application File Locator",
        0x95 => "Terminal Verification Results",
        0x9A => "Transaction Date",
        0x9C => "Transaction Type",
        0xA5 => "FCI Proprietary Template",
        0x9F02 => "Amount, Authorised",
        0x9F07 => "Application Usage Control",
        0x9F08 => "Application Version Number (Card)",
        0x9F10 => "Issuer Application Data",
        0x9F1A => "Terminal Country Code",
        0x9F26 => "Application Cryptogram",
        0x9F27 => "Cryptogram Information Data",
        0x9F2D => "ICC PIN Encipherment Public Key Certificate",
        0x9F2E => "ICC PIN Encipherment Public Key Exponent",
        0x9F2F => "ICC PIN Encipherment Public Key Remainder",
        0x9F32 => "Issuer Public Key Exponent",
        0x9F34 => "CVM Results",
        0x9F35 => "Terminal Type",
        0x9F36 => "Application Transaction Counter",
        0x9F37 => "Unpredictable Number",
        0x9F38 => "PDOL",
        0x9F42 => "Application Currency Code",
        0x9F45 => "Data Authentication Code",
        0x9F46 => "ICC Public Key Certificate",
        0x9F47 => "ICC Public Key Exponent",
        0x9F48 => "ICC Public Key Remainder",
        0x9F49 => "DDOL",
        0x9F4A => "Static Data Authentication Tag List",
        0x9F4B => "Signed Dynamic Application Data",
        0x9F4C => "ICC Dynamic Number",
        _ => "Unknown Tag",
    }
}
