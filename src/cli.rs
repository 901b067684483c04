use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stratus::UnitKind;

/// Stratus - deployment topology composer
#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan and provision the active topology
    Deploy {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "stratus.toml")]
        manifest: PathBuf,

        /// Active units (overrides the manifest selection)
        #[arg(short, long, value_delimiter = ',')]
        units: Option<Vec<UnitKind>>,

        /// Ambient deployment region (overrides manifest and environment)
        #[arg(short, long)]
        region: Option<String>,

        /// Dry run - show what would be provisioned
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the dependency-ordered provisioning plan
    Plan {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "stratus.toml")]
        manifest: PathBuf,

        /// Active units (overrides the manifest selection)
        #[arg(short, long, value_delimiter = ',')]
        units: Option<Vec<UnitKind>>,

        /// Ambient deployment region (overrides manifest and environment)
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Diff the plan against the recorded deployment state
    Diff {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "stratus.toml")]
        manifest: PathBuf,
    },

    /// Print the recorded deployment outputs
    Outputs {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "stratus.toml")]
        manifest: PathBuf,
    },

    /// Tear down the recorded deployment in reverse order
    Destroy {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "stratus.toml")]
        manifest: PathBuf,

        /// Confirm the teardown (required)
        #[arg(short, long)]
        yes: bool,
    },
}
