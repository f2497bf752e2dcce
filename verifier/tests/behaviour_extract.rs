//! BDD tests for manifest extraction.

use parcel_verifier::config::VerifierConfig;
use parcel_verifier::extractor::ExtractManifestError;
use parcel_verifier::extract_manifest_with;
use parcel_verifier::package::codec::encode_manifest;
use parcel_verifier::package::manifest::Manifest;
use parcel_verifier::test_utils::{PackageBuilder, RecordingObserver};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;
use std::path::PathBuf;

struct ExtractWorld {
    temp: tempfile::TempDir,
    package: Option<PathBuf>,
    output: Option<PathBuf>,
    result: Option<Result<Manifest, ExtractManifestError>>,
}

impl ExtractWorld {
    fn build(&mut self, name: &str, builder: &PackageBuilder) {
        let path = self.temp.path().join(name);
        builder.build(&path).expect("build package");
        self.package = Some(path);
    }

    fn extract(&mut self, output: Option<PathBuf>) {
        let package = self.package.clone().expect("package built");
        let observer = RecordingObserver::default();
        let result = extract_manifest_with(
            &package,
            output.as_deref(),
            &VerifierConfig::default(),
            &observer,
        );
        self.output = output;
        self.result = Some(result);
    }

    fn manifest(&self) -> &Manifest {
        match self.result.as_ref().expect("result set") {
            Ok(manifest) => manifest,
            Err(err) => panic!("expected extraction to succeed, got {err}"),
        }
    }

    fn error(&self) -> &ExtractManifestError {
        match self.result.as_ref().expect("result set") {
            Err(err) => err,
            Ok(_) => panic!("expected extraction to fail"),
        }
    }
}

#[fixture]
fn world() -> ExtractWorld {
    ExtractWorld {
        temp: tempfile::tempdir().expect("temp dir"),
        package: None,
        output: None,
        result: None,
    }
}

#[given("a package \"{name}\" whose manifest has title \"{title}\"")]
fn given_titled_package(world: &mut ExtractWorld, name: String, title: String) {
    let manifest = Manifest::new("alice")
        .with_metadata("title", json!(title))
        .expect("metadata");
    let builder = PackageBuilder::new().manifest(&manifest).expect("encode");
    world.build(&name, &builder);
}

#[given("a package \"{name}\" without a manifest")]
fn given_no_manifest(world: &mut ExtractWorld, name: String) {
    world.build(&name, &PackageBuilder::new().without_manifest());
}

#[given("a package \"{name}\" whose manifest is \"{text}\"")]
fn given_raw_manifest(world: &mut ExtractWorld, name: String, text: String) {
    world.build(&name, &PackageBuilder::new().raw_manifest(text));
}

#[when("the manifest is extracted")]
fn when_extracted(world: &mut ExtractWorld) {
    world.extract(None);
}

#[when("the manifest is extracted to \"{output}\"")]
fn when_extracted_to(world: &mut ExtractWorld, output: String) {
    let path = world.temp.path().join(output);
    world.extract(Some(path));
}

#[then("the manifest subject is \"{subject}\"")]
fn then_subject(world: &mut ExtractWorld, subject: String) {
    assert_eq!(world.manifest().signature().subject(), subject);
}

#[then("the manifest title is \"{title}\"")]
fn then_title(world: &mut ExtractWorld, title: String) {
    assert_eq!(world.manifest().metadata_value("title"), Some(&json!(title)));
}

#[then("the output file holds the canonical manifest")]
fn then_output_written(world: &mut ExtractWorld) {
    let output = world.output.as_ref().expect("output path set");
    let written = std::fs::read_to_string(output).expect("read output");
    let expected = encode_manifest(world.manifest()).expect("encode");
    assert_eq!(written, expected);
}

#[then("extraction fails mentioning \"{text}\"")]
fn then_fails_mentioning(world: &mut ExtractWorld, text: String) {
    let message = world.error().to_string();
    assert!(message.contains(&text), "expected '{text}' in: {message}");
}

#[then("the extracted manifest is still available")]
fn then_manifest_available(world: &mut ExtractWorld) {
    let manifest = world
        .error()
        .extracted_manifest()
        .expect("manifest carried by the error");
    assert_eq!(manifest.signature().subject(), "alice");
}

#[scenario(
    path = "tests/features/extract_manifest.feature",
    name = "Manifest is extracted from a package"
)]
fn scenario_extracted(world: ExtractWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extract_manifest.feature",
    name = "Manifest is written to an output file"
)]
fn scenario_written(world: ExtractWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extract_manifest.feature",
    name = "Package without a manifest is reported"
)]
fn scenario_missing_manifest(world: ExtractWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extract_manifest.feature",
    name = "Malformed manifest is reported"
)]
fn scenario_malformed(world: ExtractWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extract_manifest.feature",
    name = "Unwritable output keeps the extracted manifest"
)]
fn scenario_unwritable_output(world: ExtractWorld) {
    let _ = world;
}
