//! Certificate chain driver: CA key, issuer key, ICC key, then the
//! authentication method the card supports

use emv_ca_keys::{KeyRegistry, PublicKey};
use emv_common::{tags, Store};
use tracing::debug;

use crate::cda::{self, CdaRequest, CdaVerified};
use crate::certificate::{recover_icc_key, recover_issuer_key};
use crate::dda;
use crate::error::{AuthError, Result};
use crate::sda::recover_dac;
use crate::static_data::{static_data_to_authenticate, Afl, Record};

/// Authentication method detected from the AIP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMethod {
    Sda,
    Dda,
    Cda,
    None,
}

impl AuthenticationMethod {
    /// Strongest method the Application Interchange Profile advertises
    pub fn from_aip(aip: &[u8]) -> Self {
        let Some(&byte1) = aip.first() else {
            return Self::None;
        };

        // Check bits in order of preference (CDA > DDA > SDA)
        if byte1 & 0x01 != 0 {
            Self::Cda
        } else if byte1 & 0x20 != 0 {
            Self::Dda
        } else if byte1 & 0x40 != 0 {
            Self::Sda
        } else {
            Self::None
        }
    }
}

/// Furthest point the chain reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChainStage {
    Start,
    CaKeyResolved,
    IssuerKeyRecovered,
    IccKeyRecovered,
    CdaVerified,
}

/// Outcome of verifying one card, kept for audit.
///
/// Once `failure` is set the report is final; later steps refuse to run.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub auth_method: AuthenticationMethod,
    pub stage: ChainStage,
    pub ca_key: Option<PublicKey>,
    pub issuer_key: Option<PublicKey>,
    pub icc_key: Option<PublicKey>,
    pub data_authentication_code: Option<[u8; 2]>,
    pub dynamic_number: Option<Vec<u8>>,
    pub cda: Option<CdaVerified>,
    pub failure: Option<AuthError>,
}

impl VerificationReport {
    fn new(auth_method: AuthenticationMethod) -> Self {
        Self {
            auth_method,
            stage: ChainStage::Start,
            ca_key: None,
            issuer_key: None,
            icc_key: None,
            data_authentication_code: None,
            dynamic_number: None,
            cda: None,
            failure: None,
        }
    }

    fn failed(mut self, err: AuthError) -> Self {
        self.record(err);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Whether the card is authenticated by the method its AIP names.
    ///
    /// DDA and CDA cards need their dynamic signature verified; a recovered
    /// ICC key alone does not authenticate a card.
    pub fn is_valid(&self) -> bool {
        if self.is_failed() {
            return false;
        }

        match self.auth_method {
            AuthenticationMethod::Sda => self.data_authentication_code.is_some(),
            AuthenticationMethod::Dda => self.dynamic_number.is_some(),
            AuthenticationMethod::Cda => self.stage == ChainStage::CdaVerified,
            AuthenticationMethod::None => false,
        }
    }

    fn usable_icc_key(&self) -> Result<&PublicKey> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        self.icc_key
            .as_ref()
            .ok_or(AuthError::MissingInput(tags::ICC_PUBLIC_KEY_CERTIFICATE))
    }

    /// Verify an INTERNAL AUTHENTICATE response with the recovered ICC key.
    ///
    /// The signature is taken from `response` alone. Once verified, the
    /// response objects and the ICC Dynamic Number are added to `store`.
    pub fn verify_dda(&mut self, store: &mut Store, ddol_data: &[u8], response: &[u8]) -> Result<()> {
        let result = self.usable_icc_key().and_then(|icc_key| {
            let mut response = dda::parse_internal_authenticate(response)?;
            let number = dda::verify_dda(&mut response, icc_key, ddol_data)?;
            store.extend(response);
            Ok(number)
        });

        match result {
            Ok(number) => {
                self.dynamic_number = Some(number);
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Verify a GENERATE AC signature with the recovered ICC key
    pub fn verify_cda(&mut self, store: &mut Store, request: &CdaRequest<'_>, response: &[u8]) -> Result<()> {
        let result = self
            .usable_icc_key()
            .and_then(|icc_key| cda::verify_cda(store, icc_key, request, response));

        match result {
            Ok(verified) => {
                self.stage = ChainStage::CdaVerified;
                self.dynamic_number = Some(verified.dynamic_number.clone());
                self.cda = Some(verified);
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    fn record(&mut self, err: AuthError) -> AuthError {
        if self.failure.is_none() {
            debug!(stage = ?self.stage, "offline data authentication failed: {err}");
            self.failure = Some(err);
        }
        err
    }
}

/// Runs certificate chains against a shared CA key registry
#[derive(Debug, Clone, Copy)]
pub struct ChainVerifier<'r> {
    registry: &'r KeyRegistry,
}

impl<'r> ChainVerifier<'r> {
    pub fn new(registry: &'r KeyRegistry) -> Self {
        Self { registry }
    }

    /// Find the CA key named by the card: RID from the DF name (84) or
    /// AID (4F), index from tag 8F
    pub fn resolve_ca_key(&self, store: &Store) -> Result<&'r PublicKey> {
        let aid = store
            .value(tags::DEDICATED_FILE_NAME)
            .or_else(|| store.value(tags::APPLICATION_IDENTIFIER))
            .ok_or(AuthError::MissingInput(tags::DEDICATED_FILE_NAME))?;
        let rid: [u8; 5] = aid
            .get(..5)
            .and_then(|rid| rid.try_into().ok())
            .ok_or(AuthError::FormatInvalid("application identifier shorter than a RID"))?;

        let index = match store.value(tags::CA_PUBLIC_KEY_INDEX) {
            Some(&[index]) => index,
            Some(_) => return Err(AuthError::FormatInvalid("CA public key index must be one byte")),
            None => return Err(AuthError::MissingInput(tags::CA_PUBLIC_KEY_INDEX)),
        };

        self.registry
            .lookup(&rid, index)
            .ok_or(AuthError::UnknownParentKey { rid, index })
    }

    /// Assemble the static data to be authenticated from the AFL in `store`
    /// and the records read, then run [`ChainVerifier::verify`]
    pub fn verify_records(&self, store: &mut Store, records: &[Record]) -> VerificationReport {
        let static_data = store
            .value(tags::AFL)
            .ok_or(AuthError::MissingInput(tags::AFL))
            .and_then(Afl::parse)
            .and_then(|afl| static_data_to_authenticate(&afl, records, store));

        match static_data {
            Ok(static_data) => self.verify(store, &static_data),
            Err(err) => {
                let auth_method = store
                    .value(tags::AIP)
                    .map_or(AuthenticationMethod::None, AuthenticationMethod::from_aip);
                VerificationReport::new(auth_method).failed(err)
            }
        }
    }

    /// Walk the certificate chain of the card in `store`.
    ///
    /// SDA cards stop after the issuer key with the DAC recovered. DDA and
    /// CDA cards continue to the ICC key; their dynamic signatures are
    /// checked afterwards with `VerificationReport::verify_dda` or
    /// `VerificationReport::verify_cda`.
    pub fn verify(&self, store: &mut Store, static_data: &[u8]) -> VerificationReport {
        let auth_method = store
            .value(tags::AIP)
            .map_or(AuthenticationMethod::None, AuthenticationMethod::from_aip);
        let mut report = VerificationReport::new(auth_method);

        if auth_method == AuthenticationMethod::None {
            let err = if store.value(tags::AIP).is_some() {
                AuthError::FormatInvalid("AIP names no offline data authentication method")
            } else {
                AuthError::MissingInput(tags::AIP)
            };
            return report.failed(err);
        }

        let ca_key = match self.resolve_ca_key(store) {
            Ok(key) => key,
            Err(err) => return report.failed(err),
        };
        report.ca_key = Some(ca_key.clone());
        report.stage = ChainStage::CaKeyResolved;

        let issuer_key = match recover_issuer_key(store, ca_key) {
            Ok(key) => key,
            Err(err) => return report.failed(err),
        };
        report.stage = ChainStage::IssuerKeyRecovered;

        if auth_method == AuthenticationMethod::Sda {
            let dac = recover_dac(store, &issuer_key, static_data);
            report.issuer_key = Some(issuer_key);
            return match dac {
                Ok(dac) => {
                    report.data_authentication_code = Some(dac);
                    report
                }
                Err(err) => report.failed(err),
            };
        }

        let icc_key = recover_icc_key(store, &issuer_key, static_data);
        report.issuer_key = Some(issuer_key);
        match icc_key {
            Ok(key) => {
                report.icc_key = Some(key);
                report.stage = ChainStage::IccKeyRecovered;
                report
            }
            Err(err) => report.failed(err),
        }
    }
}
