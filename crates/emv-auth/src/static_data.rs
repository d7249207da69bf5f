//! Static data to be authenticated (EMV Book 3, section 10.3)

use emv_common::{parse_tag_list, tags, Store};
use tracing::debug;

use crate::error::{AuthError, Result};

/// One Application File Locator entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AflEntry {
    pub sfi: u8,
    pub first: u8,
    pub last: u8,
    /// Number of records, from `first`, that take part in offline data
    /// authentication
    pub oda_records: u8,
}

/// Application File Locator (tag 94)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Afl {
    entries: Vec<AflEntry>,
}

impl Afl {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(AuthError::FormatInvalid("AFL length is not a multiple of 4"));
        }

        let entries = data
            .chunks_exact(4)
            .map(|chunk| {
                let entry = AflEntry {
                    sfi: chunk[0] >> 3,
                    first: chunk[1],
                    last: chunk[2],
                    oda_records: chunk[3],
                };

                if entry.sfi == 0 || entry.sfi == 31 || entry.first == 0 || entry.last < entry.first {
                    return Err(AuthError::FormatInvalid("AFL entry"));
                }
                if entry.oda_records > entry.last - entry.first + 1 {
                    return Err(AuthError::FormatInvalid("AFL offline record count exceeds the range"));
                }
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[AflEntry] {
        &self.entries
    }

    /// Every record to read, as `(sfi, record)` in AFL order
    pub fn records(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| (entry.first..=entry.last).map(move |record| (entry.sfi, record)))
    }

    /// Records that take part in offline data authentication
    pub fn oda_records(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| (0..entry.oda_records).map(move |i| (entry.sfi, entry.first + i)))
    }
}

/// A READ RECORD response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub sfi: u8,
    pub number: u8,
    pub data: Vec<u8>,
}

/// Build the static data to be authenticated.
///
/// Records from SFI 1 to 10 contribute the value of their `70` template,
/// records from SFI 11 to 30 contribute everything they hold. The AIP is
/// appended when the Static Data Authentication Tag List asks for it.
pub fn static_data_to_authenticate(afl: &Afl, records: &[Record], store: &Store) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    for (sfi, number) in afl.oda_records() {
        let record = records
            .iter()
            .find(|record| record.sfi == sfi && record.number == number)
            .ok_or(AuthError::MissingInput(tags::RECORD_TEMPLATE))?;

        if sfi <= 10 {
            let parsed = Store::parse(&record.data)?;
            match parsed.roots() {
                [template] if template.tag() == tags::RECORD_TEMPLATE => data.extend_from_slice(template.value()),
                _ => return Err(AuthError::FormatInvalid("offline authentication record is not a 70 template")),
            }
        } else {
            data.extend_from_slice(&record.data);
        }
    }

    if let Some(list) = store.value(tags::STATIC_DATA_AUTHENTICATION_TAG_LIST) {
        for tag in parse_tag_list(list)? {
            if tag != tags::AIP {
                return Err(AuthError::FormatInvalid("static data tag list may only name the AIP"));
            }
            let aip = store.value(tags::AIP).ok_or(AuthError::MissingInput(tags::AIP))?;
            data.extend_from_slice(aip);
        }
    }

    debug!(len = data.len(), "static data to be authenticated");
    Ok(data)
}
