//! Deterministic RSA keys and a synthetic card personalised with them
#![allow(dead_code)]

use emv_auth::{Afl, CdaRequest, Record};
use emv_ca_keys::{CaKey, KeyRegistry, PublicKey};
use emv_common::{tags, HashAlgorithm, Store, Tag, Tlv};
use rsa::BigUint;

pub const RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x00, 0x03];
pub const CA_INDEX: u8 = 0x01;
pub const AID: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];
pub const PAN: &[u8] = &[0x47, 0x61, 0x73, 0x90, 0x01, 0x01, 0x00, 0x10];

/// SFI 1 record 1 takes part in offline data authentication, SFI 2
/// records 1 and 2 carry the certificates
pub const AFL: [u8; 8] = [0x08, 0x01, 0x01, 0x01, 0x10, 0x01, 0x02, 0x00];

pub const AIP_SDA: [u8; 2] = [0x58, 0x00];
pub const AIP_DDA: [u8; 2] = [0x78, 0x00];
pub const AIP_CDA: [u8; 2] = [0x39, 0x00];

pub const UNPREDICTABLE_NUMBER: [u8; 4] = [0x12, 0x34, 0x56, 0x78];
pub const PDOL_DATA: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x08, 0x26];
pub const CDOL1_DATA: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x26, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x08, 0x26, 0x24, 0x10, 0x19, 0x00, 0x12, 0x34, 0x56, 0x78,
];

/// RSA key pair used to sign test certificates and signatures
pub struct TestKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    private_exponent: BigUint,
}

impl TestKey {
    fn new(modulus: &str, exponent: &[u8], private_exponent: &str) -> Self {
        Self {
            modulus: hex::decode(modulus).unwrap(),
            exponent: exponent.to_vec(),
            private_exponent: BigUint::from_bytes_be(&hex::decode(private_exponent).unwrap()),
        }
    }

    /// 1024 bit CA key, e = 3
    pub fn ca() -> Self {
        Self::new(
            "CDFA9A5922778614D1A0B14CE4CFBC5FC84575F8C868B88B0478BC25B4DFE9329048879616A51AD573674326612ECE2C\
             147D9802086078522E13931B43171796A85A328783324886F05D9272E3E79A2255613FE9B9C2E4A24178BE9B2F5D0AA1\
             79F75C64B5A9A8890CBBA99914604E446A7EFD1B0A8699F11C2A8DAD03B57B23",
            &[0x03],
            "8951BC3B6C4FAEB88BC076334335283FDAD8F950859B25B202FB2819233FF0CC60305A640F18BC8E4CEF8219961F341D\
             62FE6556B0405036C96262122CBA0FB8923520C42C3AF7AEA0042EEB6C3D002BC4A2D097E6A792C2F73A69DE20209B42\
             47A64F13D385648A59152179778737C0147DEFCF4305BC1B1241D3CB7862084B",
        )
    }

    /// 896 bit issuer key, e = 3
    pub fn issuer() -> Self {
        Self::new(
            "F308C0F107124558D5BD6D064C8BA4CF9731F400865D1224091652A74424B76FB91E8F751A26BAA0AF76F69773984C05\
             7A5D2EFAF79E9401BFAA797CD1C3C0931341D8355D33BB401E33BA2A525C886044AB2517CB98FAA841785DF117467746\
             A828F4AA600355F6F98F78FFA4F02AAD",
            &[0x03],
            "A205D5F604B6D8E5E3D39E043307C3350F76A2AB043E0C18060EE1C4D8187A4A7B69B4F8BC19D1C074F9F9BA4D1032AE\
             519374A74FBF0D55332DF31ADCA32B872808561CCE0ADC1988FD1A7FEE394EE9B7A5B48AE1817A32241905EA3A028093\
             73230BF339B40984943026CA7782AF6B",
        )
    }

    /// 768 bit ICC key, e = 65537
    pub fn icc() -> Self {
        Self::new(
            "BE77E7319A519E1BB76038CD8293A44B6FB68D9183A4E65DD2E160745D72F8A04B19B9FCC3337D41D0717F0FBFFA401F\
             0D2D9E7E31E760B2648517C9D82D286C9CF550ED8BFB7AEF2D975A7936BDAC3E9CBE50E3A22225D370CA834196933E8D",
            &[0x01, 0x00, 0x01],
            "0F10ECF8BF7C35457BFBE0826111CCAD2AE905C9BCE00E58DD95764BBE189A1213DEB5178959494F2B6DCEDF30105B81\
             F65916EF058F54AB2032DD6AF61AAFC4B2D10E6C452E62421EC3F099EBE65F7F9420A5CD9B6598F855EBB06C0A3A1701",
        )
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    pub fn len(&self) -> usize {
        self.modulus.len()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(RID, CA_INDEX, &self.modulus, &self.exponent).unwrap()
    }

    /// Raw RSA private operation on a block of exactly `len()` bytes
    pub fn sign(&self, block: &[u8]) -> Vec<u8> {
        assert_eq!(block.len(), self.len());
        let n = BigUint::from_bytes_be(&self.modulus);
        let signed = BigUint::from_bytes_be(block)
            .modpow(&self.private_exponent, &n)
            .to_bytes_be();

        let mut out = vec![0; self.len() - signed.len()];
        out.extend_from_slice(&signed);
        out
    }
}

/// Registry holding only the test CA key
pub fn registry() -> KeyRegistry {
    KeyRegistry::from_keys([CaKey {
        scheme: "Test".to_string(),
        key: TestKey::ca().public_key(),
    }])
}

pub fn sha1(parts: &[&[u8]]) -> Vec<u8> {
    HashAlgorithm::Sha1.digest(parts.iter().copied())
}

/// Frame `payload` as a `len` byte message: header, payload, BB padding,
/// SHA-1 over payload, padding and `extra`, trailer
pub fn message(len: usize, payload: &[u8], extra: &[&[u8]]) -> Vec<u8> {
    let mut data = vec![0x6A];
    data.extend_from_slice(payload);
    data.resize(len - 21, 0xBB);

    let mut parts = vec![&data[1..]];
    parts.extend_from_slice(extra);
    let hash = sha1(&parts);

    data.extend_from_slice(&hash);
    data.push(0xBC);
    data
}

/// Flip a bit in the hash result of a framed message
pub fn corrupt_hash(message: &mut [u8]) {
    let last = message.len() - 2;
    message[last] ^= 0x01;
}

/// Fields of an issuer or ICC public key certificate
#[derive(Debug, Clone)]
pub struct Certificate {
    pub format: u8,
    pub identifier: Vec<u8>,
    pub expiry: [u8; 2],
    pub serial: [u8; 3],
    pub hash_algorithm: u8,
    pub key_algorithm: u8,
    /// Declared key length, the modulus length when `None`
    pub key_len: Option<u8>,
    /// Declared exponent length, the exponent length when `None`
    pub exponent_len: Option<u8>,
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
    pub corrupt_hash: bool,
}

impl Certificate {
    pub fn issuer(key: &TestKey) -> Self {
        Self {
            format: 0x02,
            identifier: vec![0x47, 0x61, 0x73, 0xFF],
            expiry: [0x12, 0x49],
            serial: [0x00, 0x00, 0x01],
            hash_algorithm: 0x01,
            key_algorithm: 0x01,
            key_len: None,
            exponent_len: None,
            modulus: key.modulus().to_vec(),
            exponent: key.exponent().to_vec(),
            corrupt_hash: false,
        }
    }

    pub fn icc(key: &TestKey) -> Self {
        let mut identifier = PAN.to_vec();
        identifier.extend_from_slice(&[0xFF, 0xFF]);

        Self {
            format: 0x04,
            identifier,
            expiry: [0x12, 0x29],
            serial: [0x00, 0x00, 0x02],
            ..Self::issuer(key)
        }
    }

    /// Signed certificate and public key remainder
    pub fn sign(&self, signer: &TestKey, extra: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut payload = vec![self.format];
        payload.extend_from_slice(&self.identifier);
        payload.extend_from_slice(&self.expiry);
        payload.extend_from_slice(&self.serial);
        payload.push(self.hash_algorithm);
        payload.push(self.key_algorithm);
        payload.push(self.key_len.unwrap_or(self.modulus.len() as u8));
        payload.push(self.exponent_len.unwrap_or(self.exponent.len() as u8));

        let room = signer.len() - 1 - payload.len() - 21;
        let (leftmost, remainder) = self.modulus.split_at(room.min(self.modulus.len()));
        payload.extend_from_slice(leftmost);

        let mut block = message(signer.len(), &payload, &[remainder, &self.exponent, extra]);
        if self.corrupt_hash {
            corrupt_hash(&mut block);
        }
        (signer.sign(&block), remainder.to_vec())
    }
}

/// Signed Static Application Data carrying `dac`
pub fn signed_static_data(issuer: &TestKey, dac: [u8; 2], static_data: &[u8]) -> Vec<u8> {
    let payload = [0x03, 0x01, dac[0], dac[1]];
    issuer.sign(&message(issuer.len(), &payload, &[static_data]))
}

/// Signed Dynamic Application Data over `dynamic_data`
pub fn signed_dynamic_data(icc: &TestKey, dynamic_data: &[u8], extra: &[u8], corrupt: bool) -> Vec<u8> {
    let mut payload = vec![0x05, 0x01, dynamic_data.len() as u8];
    payload.extend_from_slice(dynamic_data);

    let mut block = message(icc.len(), &payload, &[extra]);
    if corrupt {
        corrupt_hash(&mut block);
    }
    icc.sign(&block)
}

/// Format 1 INTERNAL AUTHENTICATE response
pub fn internal_authenticate(icc: &TestKey, ddol_data: &[u8], dynamic_number: &[u8]) -> Vec<u8> {
    let mut dynamic_data = vec![dynamic_number.len() as u8];
    dynamic_data.extend_from_slice(dynamic_number);
    let signature = signed_dynamic_data(icc, &dynamic_data, ddol_data, false);
    Tlv::new(tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1, signature).encode()
}

/// Card responses of a personalised test card
pub struct Card {
    pub select: Vec<u8>,
    pub gpo: Vec<u8>,
    pub records: Vec<Record>,
    pub static_data: Vec<u8>,
}

impl Card {
    /// Personalise a card. The ICC certificate and the Signed Static
    /// Application Data are optional.
    pub fn personalise(aip: [u8; 2], issuer: &Certificate, icc: Option<&Certificate>, dac: Option<[u8; 2]>) -> Self {
        let select = Tlv::constructed(
            tags::FCI_TEMPLATE,
            vec![
                Tlv::new(tags::DEDICATED_FILE_NAME, AID),
                Tlv::constructed(tags::FCI_PROPRIETARY_TEMPLATE, vec![Tlv::new(0x50, b"TEST CARD".to_vec())]),
            ],
        )
        .encode();
        let gpo = Tlv::constructed(
            tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2,
            vec![Tlv::new(tags::AIP, aip), Tlv::new(tags::AFL, AFL)],
        )
        .encode();

        let oda_record = Tlv::constructed(
            tags::RECORD_TEMPLATE,
            vec![
                Tlv::new(tags::APPLICATION_PAN, PAN),
                Tlv::new(tags::APPLICATION_EXPIRATION_DATE, [0x29, 0x12, 0x31]),
                Tlv::new(tags::STATIC_DATA_AUTHENTICATION_TAG_LIST, [0x82]),
            ],
        );
        let static_data = [oda_record.value(), &aip[..]].concat();

        let ca_key = TestKey::ca();
        let issuer_key = TestKey::issuer();

        let (issuer_certificate, issuer_remainder) = issuer.sign(&ca_key, &[]);
        let mut issuer_record = vec![
            Tlv::new(tags::CA_PUBLIC_KEY_INDEX, [CA_INDEX]),
            Tlv::new(tags::ISSUER_PUBLIC_KEY_CERTIFICATE, issuer_certificate),
            Tlv::new(tags::ISSUER_PUBLIC_KEY_EXPONENT, issuer.exponent.clone()),
        ];
        if !issuer_remainder.is_empty() {
            issuer_record.push(Tlv::new(tags::ISSUER_PUBLIC_KEY_REMAINDER, issuer_remainder));
        }
        if let Some(dac) = dac {
            issuer_record.push(Tlv::new(
                tags::SIGNED_STATIC_APPLICATION_DATA,
                signed_static_data(&issuer_key, dac, &static_data),
            ));
        }

        let mut icc_record = Vec::new();
        if let Some(icc) = icc {
            let (icc_certificate, icc_remainder) = icc.sign(&issuer_key, &static_data);
            icc_record.push(Tlv::new(tags::ICC_PUBLIC_KEY_CERTIFICATE, icc_certificate));
            icc_record.push(Tlv::new(tags::ICC_PUBLIC_KEY_EXPONENT, icc.exponent.clone()));
            if !icc_remainder.is_empty() {
                icc_record.push(Tlv::new(tags::ICC_PUBLIC_KEY_REMAINDER, icc_remainder));
            }
        }

        let records = vec![
            Record {
                sfi: 1,
                number: 1,
                data: oda_record.encode(),
            },
            Record {
                sfi: 2,
                number: 1,
                data: Tlv::constructed(tags::RECORD_TEMPLATE, issuer_record).encode(),
            },
            Record {
                sfi: 2,
                number: 2,
                data: Tlv::constructed(tags::RECORD_TEMPLATE, icc_record).encode(),
            },
        ];

        Self {
            select,
            gpo,
            records,
            static_data,
        }
    }

    pub fn sda(dac: [u8; 2]) -> Self {
        Self::personalise(AIP_SDA, &Certificate::issuer(&TestKey::issuer()), None, Some(dac))
    }

    pub fn dda() -> Self {
        Self::personalise(
            AIP_DDA,
            &Certificate::issuer(&TestKey::issuer()),
            Some(&Certificate::icc(&TestKey::icc())),
            None,
        )
    }

    pub fn cda() -> Self {
        Self::personalise(
            AIP_CDA,
            &Certificate::issuer(&TestKey::issuer()),
            Some(&Certificate::icc(&TestKey::icc())),
            None,
        )
    }

    pub fn afl(&self) -> Afl {
        Afl::parse(&AFL).unwrap()
    }

    /// Every data object the card returned plus the terminal's
    /// Unpredictable Number
    pub fn store(&self) -> Store {
        let mut store = Store::parse(&self.select).unwrap();
        store.extend(Store::parse(&self.gpo).unwrap());
        for record in &self.records {
            store.extend(Store::parse(&record.data).unwrap());
        }
        store.add(Tlv::new(tags::UNPREDICTABLE_NUMBER, UNPREDICTABLE_NUMBER));
        store
    }
}

/// Flattened copy of `store` with every object carrying `tag` replaced by
/// `value`, or dropped when `value` is `None`
pub fn replace(store: &Store, tag: Tag, value: Option<&[u8]>) -> Store {
    let objects = store
        .iter()
        .filter(|tlv| !tlv.is_constructed())
        .filter_map(|tlv| match (tlv.tag() == tag, value) {
            (false, _) => Some(tlv.clone()),
            (true, Some(value)) => Some(Tlv::new(tag, value)),
            (true, None) => None,
        })
        .collect::<Vec<_>>();
    Store::from(objects)
}

/// A GENERATE AC response the test card would produce
#[derive(Debug, Clone)]
pub struct GenerateAc {
    pub cid: u8,
    pub cryptogram: [u8; 8],
    pub atc: [u8; 2],
    pub issuer_application_data: Vec<u8>,
    pub dynamic_number: Vec<u8>,
    /// Sends 9F26 in clear with this value
    pub clear_cryptogram: Option<[u8; 8]>,
    /// Sends this CID in clear instead of the signed one
    pub clear_cid: Option<u8>,
    pub corrupt_signature_hash: bool,
    pub corrupt_transaction_hash: bool,
}

impl Default for GenerateAc {
    fn default() -> Self {
        Self {
            cid: 0x40,
            cryptogram: [0x1A, 0x2B, 0x3C, 0x4D, 0x5E, 0x6F, 0x70, 0x81],
            atc: [0x00, 0x2A],
            issuer_application_data: vec![0x06, 0x01, 0x0A, 0x03, 0xA0, 0x00, 0x00],
            dynamic_number: vec![0xDE, 0xAD, 0xBE, 0xEF],
            clear_cryptogram: None,
            clear_cid: None,
            corrupt_signature_hash: false,
            corrupt_transaction_hash: false,
        }
    }
}

impl GenerateAc {
    pub fn request() -> CdaRequest<'static> {
        CdaRequest {
            pdol_data: PDOL_DATA,
            cdol1_data: CDOL1_DATA,
            cdol2_data: None,
        }
    }

    /// Format 2 response body signed with `icc` for `request`
    pub fn response(&self, icc: &TestKey, request: &CdaRequest<'_>) -> Vec<u8> {
        let mut objects = vec![
            Tlv::new(tags::CRYPTOGRAM_INFORMATION_DATA, [self.clear_cid.unwrap_or(self.cid)]),
            Tlv::new(tags::APPLICATION_TRANSACTION_COUNTER, self.atc),
        ];
        if let Some(cryptogram) = self.clear_cryptogram {
            objects.push(Tlv::new(tags::APPLICATION_CRYPTOGRAM, cryptogram));
        }
        objects.push(Tlv::new(tags::ISSUER_APPLICATION_DATA, self.issuer_application_data.clone()));

        let encoded: Vec<Vec<u8>> = objects.iter().map(Tlv::encode).collect();
        let mut parts = vec![request.pdol_data, request.cdol1_data];
        parts.extend(request.cdol2_data);
        parts.extend(encoded.iter().map(Vec::as_slice));
        let mut hash_code = sha1(&parts);
        if self.corrupt_transaction_hash {
            hash_code[0] ^= 0x01;
        }

        let mut dynamic_data = vec![self.dynamic_number.len() as u8];
        dynamic_data.extend_from_slice(&self.dynamic_number);
        dynamic_data.push(self.cid);
        dynamic_data.extend_from_slice(&self.cryptogram);
        dynamic_data.extend_from_slice(&hash_code);

        let signature = signed_dynamic_data(icc, &dynamic_data, &UNPREDICTABLE_NUMBER, self.corrupt_signature_hash);
        objects.insert(2, Tlv::new(tags::SIGNED_DYNAMIC_APPLICATION_DATA, signature));

        Tlv::constructed(tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2, objects).encode()
    }
}
