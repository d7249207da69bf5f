//! Field formatters for human-readable output

use clap::ValueEnum;
use emv_auth::{Afl, AuthenticationMethod};
use emv_common::{Expiry, Tag};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw hex output
    Raw,
    /// Human-readable formatted output
    Human,
}

/// Format a field value based on its tag type
pub fn format_value(tag: Tag, value: &[u8], mode: FormatMode) -> String {
    if mode == FormatMode::Raw {
        return hex::encode_upper(value);
    }

    // Human-readable formatting
    match tag {
        // Application Label, Application Preferred Name (ASCII text)
        0x50 | 0x9F12 => String::from_utf8(value.to_vec()).unwrap_or_else(|_| hex::encode_upper(value)),

        // Cardholder Name (ASCII text)
        0x5F20 => String::from_utf8(value.to_vec())
            .unwrap_or_else(|_| hex::encode_upper(value))
            .trim()
            .to_string(),

        // Application PAN (BCD, F padded)
        0x5A => hex::encode_upper(value).trim_end_matches('F').to_string(),

        // Application Expiration Date (YYMMDD)
        0x5F24 => match Expiry::from_yymmdd(value) {
            Some(expiry) => format!("{} (Month/Year)", expiry),
            None => hex::encode_upper(value),
        },

        // Application Effective Date (YYMMDD)
        0x5F25 => {
            if value.len() == 3 {
                format!("20{:02X}/{:02X}/{:02X} (YY/MM/DD)", value[0], value[1], value[2])
            } else {
                hex::encode_upper(value)
            }
        }

        // Issuer Country Code (ISO 3166-1 numeric)
        0x5F28 => match bcd_number(value) {
            Some(code) => match get_country_name(code) {
                Some(country) => format!("{} ({})", code, country),
                None => format!("{}", code),
            },
            None => hex::encode_upper(value),
        },

        // Currency Codes
        0x5F2A | 0x9F42 => match bcd_number(value) {
            Some(code) => match get_currency_name(code) {
                Some(currency) => currency.to_string(),
                None => format!("Currency Code {}", code),
            },
            None => hex::encode_upper(value),
        },

        // Application PAN Sequence Number
        0x5F34 => {
            if value.len() == 1 {
                format!("{}", value[0])
            } else {
                hex::encode_upper(value)
            }
        }

        // Application Interchange Profile
        0x82 => format!("{} ({:?})", hex::encode_upper(value), AuthenticationMethod::from_aip(value)),

        // CA Public Key Index
        0x8F => {
            if value.len() == 1 {
                format!("{:02X} (decimal: {})", value[0], value[0])
            } else {
                hex::encode_upper(value)
            }
        }

        // Application File Locator
        0x94 => match Afl::parse(value) {
            Ok(afl) => afl
                .entries()
                .iter()
                .map(|entry| {
                    format!(
                        "SFI {} records {}-{} ({} for ODA)",
                        entry.sfi, entry.first, entry.last, entry.oda_records
                    )
                })
                .collect::<Vec<_>>()
                .join(", "),
            Err(_) => hex::encode_upper(value),
        },

        // Cryptogram Information Data
        0x9F27 => match value {
            [cid] => format!("{:02X} ({})", cid, cryptogram_type(*cid)),
            _ => hex::encode_upper(value),
        },

        // Exponents
        0x9F32 | 0x9F47 | 0x9F2E => {
            if value.len() <= 3 {
                let exp = value.iter().fold(0u32, |exp, &byte| (exp << 8) | u32::from(byte));
                format!("{} (0x{})", exp, hex::encode_upper(value))
            } else {
                hex::encode_upper(value)
            }
        }

        // Large binary fields (certificates, signatures)
        0x90 | 0x92 | 0x93 | 0x9F46 | 0x9F48 | 0x9F2D | 0x9F2F | 0x9F4B => {
            if value.len() > 32 {
                format!("{} ... ({} bytes total)", hex::encode_upper(&value[..32]), value.len())
            } else {
                hex::encode_upper(value)
            }
        }

        // Track 2 Data
        0x57 | 0x9F6B => {
            let hex_str = hex::encode_upper(value);
            hex_str.replace('D', " | ")
        }

        // Default: hex for everything else
        _ => hex::encode_upper(value),
    }
}

/// Cryptogram type from the two high bits of the Cryptogram Information Data
pub fn cryptogram_type(cid: u8) -> &'static str {
    match cid & 0xC0 {
        0x00 => "AAC",
        0x40 => "TC",
        0x80 => "ARQC",
        _ => "RFU",
    }
}

/// Numeric codes are BCD coded, `0840` is 840
fn bcd_number(value: &[u8]) -> Option<u16> {
    if value.len() != 2 {
        return None;
    }
    hex::encode(value).parse().ok()
}

/// ISO 3166-1 numeric country codes (subset)
fn get_country_name(code: u16) -> Option<&'static str> {
    match code {
        124 => Some("Canada"),
        840 => Some("United States"),
        826 => Some("United Kingdom"),
        276 => Some("Germany"),
        250 => Some("France"),
        380 => Some("Italy"),
        724 => Some("Spain"),
        528 => Some("Netherlands"),
        156 => Some("China"),
        392 => Some("Japan"),
        _ => None,
    }
}

/// ISO 4217 numeric currency codes (subset)
fn get_currency_name(code: u16) -> Option<&'static str> {
    match code {
        124 => Some("CAD (Canadian Dollar)"),
        840 => Some("USD (US Dollar)"),
        978 => Some("EUR (Euro)"),
        826 => Some("GBP (Pound Sterling)"),
        392 => Some("JPY (Japanese Yen)"),
        156 => Some("CNY (Chinese Yuan)"),
        _ => None,
    }
}
