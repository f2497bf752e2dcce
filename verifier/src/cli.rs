//! CLI argument definitions for `parcel-verify`.
//!
//! Kept separate from the entrypoint so argument parsing can be tested
//! without running any command.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Verify parcel packages and extract their manifests.
#[derive(Parser, Debug)]
#[command(name = "parcel-verify")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Verify a package, fetching the publisher key remotely:\n",
    "    $ parcel-verify verify plugin.pkg\n\n",
    "  Verify a package against a local public key:\n",
    "    $ parcel-verify verify plugin.pkg --public-key publisher.pub\n\n",
    "  Print a package manifest:\n",
    "    $ parcel-verify extract-manifest plugin.pkg",
))]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Suppress progress output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show detailed progress output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Verify a package's structure and signatures.
    Verify(VerifyArgs),

    /// Extract a package's manifest.
    ExtractManifest(ExtractManifestArgs),
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct VerifyArgs {
    /// Package file to verify.
    #[arg(value_name = "PACKAGE")]
    pub package: Utf8PathBuf,

    /// Publisher public key file; skips remote key lookup.
    #[arg(short = 'k', long, value_name = "FILE")]
    pub public_key: Option<Utf8PathBuf>,
}

/// Arguments for the extract-manifest command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct ExtractManifestArgs {
    /// Package file to read.
    #[arg(value_name = "PACKAGE")]
    pub package: Utf8PathBuf,

    /// Write the manifest here instead of standard output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_verify_with_public_key() {
        let cli = Cli::try_parse_from([
            "parcel-verify",
            "verify",
            "plugin.pkg",
            "--public-key",
            "publisher.pub",
        ])
        .expect("valid arguments");

        assert_eq!(
            cli.command,
            Command::Verify(VerifyArgs {
                package: Utf8PathBuf::from("plugin.pkg"),
                public_key: Some(Utf8PathBuf::from("publisher.pub")),
            })
        );
    }

    #[test]
    fn parses_extract_manifest_without_output() {
        let cli = Cli::try_parse_from(["parcel-verify", "extract-manifest", "plugin.pkg"])
            .expect("valid arguments");

        assert_eq!(
            cli.command,
            Command::ExtractManifest(ExtractManifestArgs {
                package: Utf8PathBuf::from("plugin.pkg"),
                output: None,
            })
        );
    }

    #[rstest]
    #[case::before_subcommand(&["parcel-verify", "--config", "v.toml", "verify", "p.pkg"])]
    #[case::after_subcommand(&["parcel-verify", "verify", "p.pkg", "--config", "v.toml"])]
    fn config_is_global(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        assert_eq!(cli.config, Some(Utf8PathBuf::from("v.toml")));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["parcel-verify", "-q", "-v", "verify", "p.pkg"]);
        assert!(result.is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["parcel-verify"]).is_err());
    }
}
