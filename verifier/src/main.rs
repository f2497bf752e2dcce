//! `parcel-verify` CLI entrypoint.
//!
//! Verifies parcel packages and extracts their manifests. Progress goes to
//! stderr, manifests go to stdout, and any failure exits with status 1.

use clap::Parser;
use parcel_verifier::cli::{Cli, Command, ExtractManifestArgs, VerifyArgs};
use parcel_verifier::config::{ConfigError, VerifierConfig};
use parcel_verifier::error::VerifyError;
use parcel_verifier::extractor::ExtractManifestError;
use parcel_verifier::observer::{PackagingObserver, StderrObserver, Verbosity};
use parcel_verifier::package::codec::{ManifestParseError, encode_manifest};
use parcel_verifier::trust::keys::HttpKeyResolver;
use parcel_verifier::trust::signature::Ed25519Verifier;
use parcel_verifier::{Collaborators, extract_manifest_with, verify_package_with};
use std::io::Write;

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Extract(#[from] ExtractManifestError),

    #[error(transparent)]
    Encode(#[from] ManifestParseError),

    #[error("failed to write to standard output: {0}")]
    Stdout(#[source] std::io::Error),
}

fn main() {
    let cli = Cli::parse();
    let observer = StderrObserver::stderr(Verbosity::from_flags(cli.quiet, cli.verbose));
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &observer, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    observer: &dyn PackagingObserver,
    stdout: &mut dyn Write,
) -> Result<(), RunError> {
    let config = load_config(cli)?;
    match &cli.command {
        Command::Verify(args) => run_verify(args, &config, observer),
        Command::ExtractManifest(args) => run_extract(args, &config, observer, stdout),
    }
}

fn load_config(cli: &Cli) -> Result<VerifierConfig, ConfigError> {
    match &cli.config {
        Some(path) => VerifierConfig::load(path.as_std_path()),
        None => Ok(VerifierConfig::default()),
    }
}

fn run_verify(
    args: &VerifyArgs,
    config: &VerifierConfig,
    observer: &dyn PackagingObserver,
) -> Result<(), RunError> {
    let resolver = HttpKeyResolver::from_config(config);
    let collaborators = Collaborators {
        key_resolver: &resolver,
        signature_verifier: &Ed25519Verifier,
        observer,
    };
    verify_package_with(
        args.package.as_std_path(),
        args.public_key.as_deref().map(camino::Utf8Path::as_std_path),
        config,
        &collaborators,
    )?;
    Ok(())
}

fn run_extract(
    args: &ExtractManifestArgs,
    config: &VerifierConfig,
    observer: &dyn PackagingObserver,
    stdout: &mut dyn Write,
) -> Result<(), RunError> {
    let output = args.output.as_deref().map(camino::Utf8Path::as_std_path);
    let manifest = extract_manifest_with(args.package.as_std_path(), output, config, observer)?;
    if output.is_none() {
        let text = encode_manifest(&manifest)?;
        writeln!(stdout, "{text}").map_err(RunError::Stdout)?;
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<(), RunError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_verifier::observer::NoopObserver;
    use parcel_verifier::test_utils::PackageBuilder;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    fn path_arg(temp: &TempDir, name: &str) -> String {
        temp.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = RunError::Config(ConfigError::Invalid {
            field: "manifest_file",
            reason: "must not be blank".to_owned(),
        });

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("manifest_file"));
    }

    #[rstest]
    fn extract_manifest_prints_to_stdout(temp: TempDir) {
        let package = path_arg(&temp, "good.pkg");
        PackageBuilder::new()
            .build(temp.path().join("good.pkg").as_path())
            .expect("build");

        let mut stdout = Vec::new();
        run(
            &cli(&["parcel-verify", "extract-manifest", package.as_str()]),
            &NoopObserver,
            &mut stdout,
        )
        .expect("extract");

        let text = String::from_utf8(stdout).expect("utf-8");
        assert!(text.contains("\"subject\": \"alice\""), "{text}");
    }

    #[rstest]
    fn extract_manifest_with_output_leaves_stdout_empty(temp: TempDir) {
        let package = path_arg(&temp, "good.pkg");
        let output = path_arg(&temp, "manifest.out.json");
        PackageBuilder::new()
            .build(temp.path().join("good.pkg").as_path())
            .expect("build");

        let mut stdout = Vec::new();
        run(
            &cli(&[
                "parcel-verify",
                "extract-manifest",
                package.as_str(),
                "--output",
                output.as_str(),
            ]),
            &NoopObserver,
            &mut stdout,
        )
        .expect("extract");

        assert!(stdout.is_empty());
        assert!(temp.path().join("manifest.out.json").is_file());
    }

    #[rstest]
    fn verify_uses_configured_workspace_root(temp: TempDir) {
        let package = path_arg(&temp, "good.pkg");
        PackageBuilder::new()
            .build(temp.path().join("good.pkg").as_path())
            .expect("build");
        let workspaces = temp.path().join("workspaces");
        let config_path = temp.path().join("verifier.toml");
        std::fs::write(
            &config_path,
            format!("workspace_root = {:?}\n", workspaces.to_string_lossy()),
        )
        .expect("write config");
        let config_arg = config_path.to_string_lossy().into_owned();

        let mut stdout = Vec::new();
        run(
            &cli(&["parcel-verify", "--config", config_arg.as_str(), "verify", package.as_str()]),
            &NoopObserver,
            &mut stdout,
        )
        .expect("verify");

        assert!(workspaces.is_dir());
    }

    #[rstest]
    fn verify_reports_invalid_package(temp: TempDir) {
        let package = path_arg(&temp, "bad.pkg");
        PackageBuilder::new()
            .without_payload()
            .build(temp.path().join("bad.pkg").as_path())
            .expect("build");

        let mut stdout = Vec::new();
        let err = run(
            &cli(&["parcel-verify", "verify", package.as_str()]),
            &NoopObserver,
            &mut stdout,
        )
        .expect_err("invalid package");

        assert!(err.to_string().contains("payload archive"));
    }

    #[rstest]
    fn unreadable_config_is_reported(temp: TempDir) {
        let config_arg = path_arg(&temp, "absent.toml");
        let result = run(
            &cli(&["parcel-verify", "--config", config_arg.as_str(), "verify", "p.pkg"]),
            &NoopObserver,
            &mut Vec::<u8>::new(),
        );
        assert!(matches!(result, Err(RunError::Config(ConfigError::Read { .. }))));
    }
}
