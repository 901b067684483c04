mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Commands};
use stratus::topology::render_diff;
use stratus::{
    ApplyEngine, ApplyOptions, DeployState, LocalProvisioner, Manifest, Region, StratusError,
    TopologyPlan, UnitKind,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Plan-time failures and provisioning failures exit differently so CI can
/// tell a rejected plan from a half-applied one.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<StratusError>() {
        Some(
            StratusError::UnresolvedDependency { .. }
            | StratusError::CyclicTopology { .. }
            | StratusError::InvalidManifest { .. }
            | StratusError::GrantScopeViolation { .. },
        ) => 2,
        Some(StratusError::ProvisioningFailure { .. } | StratusError::MissingOrigin) => 3,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Deploy {
            manifest,
            units,
            region,
            dry_run,
        } => {
            let loaded = load_manifest(&manifest, units, region)?;
            let plan = TopologyPlan::compose(&loaded)?;
            let provisioner = LocalProvisioner::new();
            let engine = ApplyEngine::new(
                &plan,
                &provisioner,
                state_path_for(&manifest),
                ApplyOptions { dry_run },
            );
            let outcome = engine.apply()?;

            if dry_run {
                println!("Dry run - no resources were provisioned.\n");
            }
            for id in &outcome.provisioned {
                println!("  + {id}");
            }
            if cli.verbose > 0 {
                for id in &outcome.skipped {
                    println!("  = {id} (converged)");
                }
            }
            println!(
                "\n{} provisioned, {} converged",
                outcome.provisioned.len(),
                outcome.skipped.len()
            );
            if !outcome.outputs.is_empty() {
                println!("\nOutputs:");
                for (key, value) in &outcome.outputs {
                    println!("  {key} = {value}");
                }
            }
            Ok(())
        }

        Commands::Plan {
            manifest,
            units,
            region,
        } => {
            let loaded = load_manifest(&manifest, units, region)?;
            let plan = TopologyPlan::compose(&loaded)?;
            print!("{}", plan.render());
            Ok(())
        }

        Commands::Diff { manifest } => {
            let loaded = load_manifest(&manifest, None, None)?;
            let plan = TopologyPlan::compose(&loaded)?;
            let state = DeployState::load(&state_path_for(&manifest))?;
            let diff = render_diff(&plan, &state)?;
            if diff.is_empty() {
                println!("No changes.");
            } else {
                print!("{diff}");
            }
            Ok(())
        }

        Commands::Outputs { manifest } => {
            let state = DeployState::load(&state_path_for(&manifest))?;
            if state.outputs().is_empty() {
                println!("No recorded outputs.");
            } else {
                for (key, value) in state.outputs() {
                    println!("{key} = {value}");
                }
            }
            Ok(())
        }

        Commands::Destroy { manifest, yes } => {
            if !yes {
                anyhow::bail!("destroy is destructive; re-run with --yes to confirm");
            }
            let loaded = load_manifest(&manifest, None, None)?;
            let plan = TopologyPlan::compose(&loaded)?;
            let provisioner = LocalProvisioner::new();
            let engine = ApplyEngine::new(
                &plan,
                &provisioner,
                state_path_for(&manifest),
                ApplyOptions::default(),
            );
            let outcome = engine.destroy(loaded.identity.retain_on_destroy)?;

            for id in &outcome.destroyed {
                println!("  - {id}");
            }
            for id in &outcome.retained {
                println!("  ~ {id} (retained)");
            }
            println!(
                "\n{} destroyed, {} retained",
                outcome.destroyed.len(),
                outcome.retained.len()
            );
            Ok(())
        }
    }
}

fn load_manifest(
    path: &Path,
    units: Option<Vec<UnitKind>>,
    region: Option<String>,
) -> anyhow::Result<Manifest> {
    let mut manifest = Manifest::load(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    manifest.apply_env_overrides();
    if let Some(units) = units {
        manifest.units = units;
    }
    if let Some(region) = region {
        manifest.region = Region::new(region);
    }
    Ok(manifest)
}

/// The state file lives next to the manifest
fn state_path_for(manifest_path: &Path) -> PathBuf {
    manifest_path.with_file_name("stratus.state")
}
