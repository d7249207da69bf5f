//! EMV Auth - Offline data authentication
//!
//! Recovers the issuer and ICC public keys from their certificates, starting
//! at a CA key from an [`emv_ca_keys::KeyRegistry`], and verifies the
//! signatures of SDA, DDA and CDA cards. All inputs come from a
//! [`emv_common::Store`] assembled from card responses and terminal data.
//!
//! Every operation is pure apart from the store insertions documented on
//! it, so one registry can serve any number of concurrent transactions.

pub mod cda;
pub mod certificate;
pub mod chain;
pub mod dda;
pub mod error;
pub mod message;
pub mod primitive;
pub mod sda;
pub mod static_data;

pub use cda::{verify_cda, CdaRequest, CdaVerified};
pub use certificate::{recover_icc_key, recover_icc_pe_key, recover_issuer_key, CertificateKind};
pub use chain::{AuthenticationMethod, ChainStage, ChainVerifier, VerificationReport};
pub use dda::{parse_internal_authenticate, verify_dda};
pub use error::{AuthError, Result};
pub use primitive::ModPow;
pub use sda::recover_dac;
pub use static_data::{static_data_to_authenticate, Afl, AflEntry, Record};
