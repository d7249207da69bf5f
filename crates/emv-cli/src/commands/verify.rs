use std::path::{Path, PathBuf};
use std::thread;

use emv_auth::{AuthenticationMethod, ChainStage, ChainVerifier, VerificationReport};
use emv_ca_keys::KeyRegistry;
use tracing::{debug, info};

use crate::dump_file::{CardDump, DumpError};
use crate::formatters::{cryptogram_type, FormatMode};

use super::describe_key;

/// Verify every dump on its own thread, sharing one registry.
///
/// Returns true when all dumps pass.
pub fn run(paths: &[PathBuf], registry: &KeyRegistry, mode: FormatMode) -> bool {
    let verifier = ChainVerifier::new(registry);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| scope.spawn(move || verify_file(path, verifier)))
            .collect();
        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut all_valid = true;
    for (path, outcome) in paths.iter().zip(outcomes) {
        println!("=== {} ===\n", path.display());
        match outcome {
            Ok(Ok(report)) => {
                print_report(&report, mode);
                all_valid &= report.is_valid();
            }
            Ok(Err(err)) => {
                eprintln!("Failed to load card dump: {}", err);
                all_valid = false;
            }
            Err(_) => {
                eprintln!("Verification of {} panicked", path.display());
                all_valid = false;
            }
        }
        println!();
    }

    info!(dumps = paths.len(), all_valid, "verification finished");
    all_valid
}

fn verify_file(path: &Path, verifier: ChainVerifier<'_>) -> Result<VerificationReport, DumpError> {
    let dump = CardDump::load(path)?;
    let report = verify_dump(&dump, verifier)?;
    debug!(path = %path.display(), stage = ?report.stage, "dump verified");
    Ok(report)
}

/// Run the certificate chain, then the dynamic signature of the card's
/// authentication method
pub fn verify_dump(dump: &CardDump, verifier: ChainVerifier<'_>) -> Result<VerificationReport, DumpError> {
    let mut store = dump.store()?;
    let mut report = verifier.verify_records(&mut store, &dump.records);

    // Failures are kept in the report
    match (report.auth_method, &dump.internal_authenticate, &dump.generate_ac) {
        (AuthenticationMethod::Dda, Some(response), _) => {
            let _ = report.verify_dda(&mut store, &dump.ddol_data, response);
        }
        (AuthenticationMethod::Cda, _, Some(response)) => {
            let _ = report.verify_cda(&mut store, &dump.cda_request(), response);
        }
        _ => {}
    }

    Ok(report)
}

fn print_report(report: &VerificationReport, mode: FormatMode) {
    println!("Authentication Method: {:?}", report.auth_method);

    if let Some(key) = &report.ca_key {
        println!(
            "CA Public Key: ✓ RID {} Index {:02X}, {}",
            hex::encode_upper(key.rid()),
            key.index(),
            describe_key(key, mode)
        );
    }
    if let Some(key) = &report.issuer_key {
        println!("Issuer Public Key: ✓ {}", describe_key(key, mode));
    }
    if let Some(key) = &report.icc_key {
        println!("ICC Public Key: ✓ {}", describe_key(key, mode));
    }
    if let Some(dac) = report.data_authentication_code {
        println!("Data Authentication Code: {}", hex::encode_upper(dac));
    }
    if let Some(dynamic_number) = &report.dynamic_number {
        println!("ICC Dynamic Number: {}", hex::encode_upper(dynamic_number));
    }
    if let Some(cda) = &report.cda {
        println!(
            "Application Cryptogram: ✓ {} ({})",
            hex::encode_upper(cda.cryptogram),
            cryptogram_type(cda.cryptogram_information)
        );
    }

    match &report.failure {
        Some(err) => println!("\nResult: ✗ failed after stage {:?}: {}", report.stage, err),
        None if report.is_valid() => println!("\nResult: ✓ offline data authentication succeeded"),
        None if report.stage == ChainStage::IccKeyRecovered => {
            println!("\nResult: ✗ offline data authentication not performed, no dynamic signature to verify")
        }
        None => println!("\nResult: ✗ offline data authentication not performed"),
    }
}
