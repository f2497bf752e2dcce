//! Log output emitted during verification.

use log::Level;
use logtest::Logger;
use parcel_verifier::config::VerifierConfig;
use parcel_verifier::observer::NoopObserver;
use parcel_verifier::test_utils::PackageBuilder;
use parcel_verifier::trust::keys::HttpKeyResolver;
use parcel_verifier::trust::signature::Ed25519Verifier;
use parcel_verifier::{Collaborators, verify_package_with};

#[test]
fn unsigned_manifest_is_verified_with_a_warning() {
    let mut logger = Logger::start();
    let temp = tempfile::tempdir().expect("temp dir");
    let package = temp.path().join("unsigned.pkg");
    PackageBuilder::new().build(&package).expect("build package");
    let config = VerifierConfig {
        workspace_root: Some(temp.path().join("workspaces")),
        ..VerifierConfig::default()
    };
    let resolver = HttpKeyResolver::from_config(&config);
    let collaborators = Collaborators {
        key_resolver: &resolver,
        signature_verifier: &Ed25519Verifier,
        observer: &NoopObserver,
    };

    verify_package_with(&package, None, &config, &collaborators).expect("verified");

    let mut warned = false;
    let mut mirrored_success = false;
    while let Some(record) = logger.pop() {
        let message = record.args().to_string();
        if record.level() == Level::Warn && message.contains("carries no authenticity guarantee") {
            warned = true;
        }
        if record.level() == Level::Debug && message.contains("Package verified successfully.") {
            mirrored_success = true;
        }
    }

    assert!(warned, "expected unsigned manifest warning to be logged");
    assert!(mirrored_success, "expected success notification to be logged");
}
