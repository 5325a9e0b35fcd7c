//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::ResolveError;
use crate::resolver::ResolutionMode;

/// vtiles - Publish, compose and launch vector-tile deployments.
#[derive(Parser, Debug)]
#[command(name = "vtiles")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "VTILES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a configuration template.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List published layers and their versions.
    Catalog,

    /// List stored deployments, newest first.
    Deployments,

    /// Show a stored deployment manifest.
    Show {
        /// Deployment name.
        name: String,
    },

    /// Resolve and store a new deployment.
    Deploy(DeployArgs),

    /// Publish layers under their next version numbers.
    Publish {
        /// Layers to publish.
        #[arg(required = true)]
        layers: Vec<String>,

        /// Directory holding `config/<layer>.json` and `data/<layer>.mbtiles`.
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,
    },

    /// Download a deployment and its layers for serving.
    Fetch {
        /// Deployment name.
        name: String,

        /// Destination directory.
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },

    /// Launch a stack serving a stored deployment.
    Launch {
        /// Deployment name, also used as the stack name.
        name: String,

        /// Server bundle version (defaults to the newest).
        #[arg(long)]
        server_version: Option<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments of the `deploy` command.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["latest", "from", "layers"]),
))]
pub struct DeployArgs {
    /// Deployment name (defaults to the configured date format).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Use the latest version of every published layer.
    #[arg(long)]
    pub latest: bool,

    /// Start from a stored deployment.
    #[arg(long, value_name = "BASE")]
    pub from: Option<String>,

    /// Layers to drop from the base deployment, comma separated.
    #[arg(long, requires = "from")]
    pub remove: Option<String>,

    /// Layers to add or re-version, as `layer:version`, comma separated.
    #[arg(long, requires = "from")]
    pub add: Option<String>,

    /// Exactly these layers, as `layer:version`, comma separated.
    #[arg(long)]
    pub layers: Option<String>,

    /// Resolve and display without storing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompts.
    #[arg(short, long)]
    pub yes: bool,

    /// Launch a stack once the deployment is stored.
    #[arg(long, conflicts_with = "dry_run")]
    pub launch: bool,

    /// Server bundle version for `--launch`.
    #[arg(long, requires = "launch")]
    pub server_version: Option<String>,
}

impl DeployArgs {
    /// Builds the resolution mode from the selected flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer list does not parse.
    pub fn mode(&self) -> Result<ResolutionMode, ResolveError> {
        if let Some(base) = &self.from {
            ResolutionMode::from_previous(
                base.as_str(),
                self.remove.as_deref().unwrap_or_default(),
                self.add.as_deref().unwrap_or_default(),
            )
        } else if let Some(layers) = &self.layers {
            ResolutionMode::explicit(layers)
        } else {
            Ok(ResolutionMode::AllLatest)
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LayerSpec;
    use clap::CommandFactory;

    fn deploy_args(args: &[&str]) -> DeployArgs {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        match cli.command {
            Commands::Deploy(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_from_previous() {
        let args = deploy_args(&[
            "vtiles",
            "deploy",
            "--from",
            "vector-tiles-2017-05-01",
            "--remove",
            "roads",
            "--add",
            "rivers:1, parks:4",
        ]);

        assert_eq!(
            args.mode().expect("valid layers"),
            ResolutionMode::FromPrevious {
                base: String::from("vector-tiles-2017-05-01"),
                remove: vec![String::from("roads")],
                overrides: vec![LayerSpec::new("rivers", 1), LayerSpec::new("parks", 4)],
            }
        );
    }

    #[test]
    fn test_deploy_requires_one_mode() {
        assert!(Cli::try_parse_from(["vtiles", "deploy"]).is_err());
        assert!(Cli::try_parse_from(["vtiles", "deploy", "--latest", "--layers", "a:1"]).is_err());
        assert!(Cli::try_parse_from(["vtiles", "deploy", "--latest", "--remove", "a"]).is_err());
    }

    #[test]
    fn test_deploy_malformed_layers() {
        let args = deploy_args(&["vtiles", "deploy", "--layers", "roads"]);
        assert!(matches!(
            args.mode(),
            Err(ResolveError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_deploy_rejects_path_like_layers() {
        let args = deploy_args(&["vtiles", "deploy", "--from", "prod", "--add", "../../escaped:1"]);
        assert!(matches!(
            args.mode(),
            Err(ResolveError::MalformedInput { .. })
        ));

        let args = deploy_args(&["vtiles", "deploy", "--layers", "a/b:1"]);
        assert!(args.mode().is_err());
    }

    #[test]
    fn test_global_output_flag() {
        let cli = Cli::try_parse_from(["vtiles", "catalog", "--output", "json"]).expect("valid");
        assert_eq!(cli.output, OutputFormat::Json);
    }
}
