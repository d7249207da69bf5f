//! Card dump files
//!
//! A dump records the card responses and terminal data of one transaction,
//! one entry per line:
//!
//! ```text
//! # comment
//! select 6F1A8407A0000000031010A50F...
//! gpo 771282023900940C08010100...
//! record 1 1 7081B3...
//! tag 9F37 12345678
//! pdol-data 0000000010000826
//! cdol1-data 000000001000...
//! generate-ac 7781C6...
//! ```
//!
//! Hex values may be split by whitespace.

use std::fs;
use std::path::{Path, PathBuf};

use emv_auth::{CdaRequest, Record};
use emv_common::{Store, Tag, Tlv, TlvError};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: invalid hex value")]
    Hex { line: usize },
    #[error("undecodable card response: {0}")]
    Tlv(#[from] TlvError),
}

/// Card responses and terminal data of one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDump {
    pub select: Option<Vec<u8>>,
    pub gpo: Option<Vec<u8>>,
    pub records: Vec<Record>,
    pub pdol_data: Vec<u8>,
    pub cdol1_data: Vec<u8>,
    pub cdol2_data: Option<Vec<u8>>,
    pub generate_ac: Option<Vec<u8>>,
    pub ddol_data: Vec<u8>,
    pub internal_authenticate: Option<Vec<u8>>,
    /// Terminal data objects such as the Unpredictable Number
    pub terminal_data: Vec<Tlv>,
}

impl CardDump {
    pub fn load(path: &Path) -> Result<Self, DumpError> {
        let text = fs::read_to_string(path).map_err(|source| DumpError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, DumpError> {
        let mut dump = CardDump::default();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }

            let mut words = line.split_whitespace();
            let Some(kind) = words.next() else {
                continue;
            };
            let syntax = |message: &str| DumpError::Syntax {
                line: line_number,
                message: message.to_string(),
            };

            match kind {
                "select" => dump.select = Some(hex_value(words, line_number)?),
                "gpo" => dump.gpo = Some(hex_value(words, line_number)?),
                "record" => {
                    let sfi = words.next().and_then(|word| word.parse::<u8>().ok());
                    let number = words.next().and_then(|word| word.parse::<u8>().ok());
                    let (Some(sfi), Some(number)) = (sfi, number) else {
                        return Err(syntax("record needs a decimal SFI and record number"));
                    };
                    dump.records.push(Record {
                        sfi,
                        number,
                        data: hex_value(words, line_number)?,
                    });
                }
                "pdol-data" => dump.pdol_data = hex_value(words, line_number)?,
                "cdol1-data" => dump.cdol1_data = hex_value(words, line_number)?,
                "cdol2-data" => dump.cdol2_data = Some(hex_value(words, line_number)?),
                "generate-ac" => dump.generate_ac = Some(hex_value(words, line_number)?),
                "ddol-data" => dump.ddol_data = hex_value(words, line_number)?,
                "internal-authenticate" => dump.internal_authenticate = Some(hex_value(words, line_number)?),
                "tag" => {
                    let tag = words
                        .next()
                        .and_then(|word| Tag::from_str_radix(word, 16).ok())
                        .ok_or_else(|| syntax("tag needs a hex tag number"))?;
                    dump.terminal_data.push(Tlv::new(tag, hex_value(words, line_number)?));
                }
                other => {
                    return Err(DumpError::Syntax {
                        line: line_number,
                        message: format!("unknown entry '{}'", other),
                    })
                }
            }
        }

        trace!(records = dump.records.len(), "parsed card dump");
        Ok(dump)
    }

    /// All card responses and terminal data objects in one store, in the
    /// order the terminal would have collected them
    pub fn store(&self) -> Result<Store, DumpError> {
        let mut store = Store::new();
        for response in self.select.iter().chain(&self.gpo) {
            store.extend(Store::parse(response)?);
        }
        for record in &self.records {
            store.extend(Store::parse(&record.data)?);
        }
        for tlv in &self.terminal_data {
            store.add(tlv.clone());
        }
        Ok(store)
    }

    /// Terminal data signed over by a CDA GENERATE AC response
    pub fn cda_request(&self) -> CdaRequest<'_> {
        CdaRequest {
            pdol_data: &self.pdol_data,
            cdol1_data: &self.cdol1_data,
            cdol2_data: self.cdol2_data.as_deref(),
        }
    }
}

fn hex_value<'a>(words: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec<u8>, DumpError> {
    let text: String = words.collect();
    hex::decode(text).map_err(|_| DumpError::Hex { line })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emv_common::tags;

    const DUMP: &str = "\
# Visa test card
select 6F0D 8407A0000000031010 A5025000

gpo 770A 820239 00 9404 08010100
record 1 1 7007 5A0547617390
tag 9F37 12345678
pdol-data 0826
cdol1-data 00000000100009
generate-ac 7703 9F2700
";

    #[test]
    fn test_parse_dump() {
        let dump = CardDump::parse(DUMP).unwrap();

        assert_eq!(dump.select.as_deref(), Some(&hex::decode("6F0D8407A0000000031010A5025000").unwrap()[..]));
        assert_eq!(dump.records.len(), 1);
        assert_eq!(dump.records[0].sfi, 1);
        assert_eq!(dump.records[0].number, 1);
        assert_eq!(dump.pdol_data, vec![0x08, 0x26]);
        assert!(dump.cdol2_data.is_none());
        assert!(dump.internal_authenticate.is_none());
        assert_eq!(dump.terminal_data, vec![Tlv::new(tags::UNPREDICTABLE_NUMBER, [0x12, 0x34, 0x56, 0x78])]);

        let request = dump.cda_request();
        assert_eq!(request.cdol1_data, &dump.cdol1_data[..]);
        assert!(request.cdol2_data.is_none());
    }

    #[test]
    fn test_dump_store() {
        let store = CardDump::parse(DUMP).unwrap().store().unwrap();

        assert_eq!(store.value(tags::DEDICATED_FILE_NAME), Some(&hex::decode("A0000000031010").unwrap()[..]));
        assert_eq!(store.value(tags::AIP), Some(&[0x39, 0x00][..]));
        assert_eq!(store.value(tags::APPLICATION_PAN), Some(&hex::decode("4761739001").unwrap()[..]));
        assert_eq!(store.value(tags::UNPREDICTABLE_NUMBER), Some(&[0x12, 0x34, 0x56, 0x78][..]));
        // The GENERATE AC response is only used by CDA verification
        assert!(store.get(tags::CRYPTOGRAM_INFORMATION_DATA).is_none());
    }

    #[test]
    fn test_syntax_errors() {
        for (text, line) in [
            ("select 6F00\nbogus 00", 2),
            ("record 1 6F00", 1),
            ("# header\n\ntag XYZ 00", 3),
        ] {
            match CardDump::parse(text) {
                Err(DumpError::Syntax { line: actual, .. }) => assert_eq!(actual, line, "{text}"),
                other => panic!("{text}: unexpected {other:?}"),
            }
        }

        assert!(matches!(CardDump::parse("gpo 77 0"), Err(DumpError::Hex { line: 1 })));
    }

    #[test]
    fn test_undecodable_response() {
        let dump = CardDump::parse("gpo 7705 8202").unwrap();
        assert!(matches!(dump.store(), Err(DumpError::Tlv(_))));
    }
}
