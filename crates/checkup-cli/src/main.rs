#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]

mod installer;
mod logging;
mod report;
mod update;

use checkup_core::{
    discover_workspace_members, is_bare_workspace_root, resolve_global_store, run_many,
    CheckupConfig, DepScope, DepcheckOracle, DisabledUsage, RegistryClient, RunSummary,
};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "checkup")]
#[command(author, version, about = "Audit package.json against node_modules and the npm registry", long_about = None)]
struct Cli {
    /// Directory to check (defaults to the current directory)
    path: Option<PathBuf>,

    /// Apply all suggested updates to package.json without prompting
    #[arg(short = 'y', long)]
    update_all: bool,

    /// Look at globally installed modules
    #[arg(short, long)]
    global: bool,

    /// Skip the check for unused packages
    #[arg(short, long)]
    skip_unused: bool,

    /// Skip devDependencies
    #[arg(short = 'p', long = "production", conflicts_with = "dev_only")]
    production: bool,

    /// Look at devDependencies only (skip dependencies)
    #[arg(short, long)]
    dev_only: bool,

    /// Ignore dependencies matching the given glob (repeatable)
    #[arg(short, long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Save exact versions (x.y.z) instead of caret ranges (^x.y.z)
    #[arg(short = 'E', long)]
    save_exact: bool,

    /// Check all workspace packages (auto-detected for bare workspace roots)
    #[arg(short, long)]
    workspaces: bool,

    /// Disable workspace auto-detection (e.g. to check only the root package)
    #[arg(long)]
    no_workspaces: bool,

    /// depcheck specials to include in the unused check
    #[arg(long, value_delimiter = ',')]
    specials: Vec<String>,

    /// Registry base URL
    #[arg(long, value_name = "URL", env = "CHECKUP_NPM_REGISTRY")]
    registry: Option<String>,

    /// Emit JSON output (stable, machine-readable)
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let had_issue = runtime.block_on(run(cli))?;

    if had_issue {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<bool> {
    // Determine the root being audited: explicit path, global store, or cwd.
    let cwd = if cli.global {
        let store = resolve_global_store().into_diagnostic()?;
        info!("the global path being searched is {}", store.display());
        store
    } else {
        let cwd = cli
            .path
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        dunce::canonicalize(&cwd).unwrap_or(cwd)
    };

    let scope = if cli.production {
        DepScope::Production
    } else if cli.dev_only {
        DepScope::DevOnly
    } else {
        DepScope::All
    };

    let config = CheckupConfig::new(cwd.clone())
        .with_global(cli.global)
        .with_scope(scope)
        .with_skip_unused(cli.skip_unused)
        .with_save_exact(cli.save_exact)
        .with_ignore(cli.ignore.clone())
        .with_specials(cli.specials.clone());

    let registry = match &cli.registry {
        Some(url) => RegistryClient::new(url),
        None => RegistryClient::from_env(),
    }
    .into_diagnostic()?;

    let roots = resolve_roots(&cli, &cwd);
    if roots.is_empty() {
        println!(
            "No workspace packages found. Make sure your package.json (or pnpm-workspace.yaml) \
             has a valid `workspaces` configuration."
        );
        return Ok(false);
    }

    // The oracle is swapped for a silent one when the unused check makes
    // no sense: global stores have no imports to analyze.
    let summary = if cli.global || cli.skip_unused {
        run_many(&config, &roots, &registry, &DisabledUsage).await
    } else {
        let oracle = DepcheckOracle::new(cli.ignore.clone(), cli.specials.clone());
        run_many(&config, &roots, &registry, &oracle).await
    };

    report::render(&summary, cli.json);

    let updated = if cli.update_all && !cli.global {
        let applied = update::apply_updates(&summary, &config)?;
        if !cli.json {
            update::print_applied(&applied, installer::detect(&cwd));
        }
        true
    } else {
        false
    };

    Ok(exit_with_issue(&summary, updated))
}

/// Roots to audit: the global store, every workspace member, or the
/// single project directory.
fn resolve_roots(cli: &Cli, cwd: &Path) -> Vec<PathBuf> {
    if cli.global {
        return vec![cwd.to_path_buf()];
    }

    if workspace_mode(cli, cwd) {
        return discover_workspace_members(cwd).unwrap_or_default();
    }

    vec![cwd.to_path_buf()]
}

/// Explicit flags take precedence; otherwise a bare workspace root (has
/// workspace config but no direct dependencies) switches mode on by
/// itself.
fn workspace_mode(cli: &Cli, cwd: &Path) -> bool {
    if cli.no_workspaces {
        return false;
    }
    if cli.workspaces {
        return true;
    }
    is_bare_workspace_root(cwd)
}

/// Process exit contract: nonzero when any root failed, or when a static
/// run reports at least one package needing attention.
fn exit_with_issue(summary: &RunSummary, updated: bool) -> bool {
    summary.any_failed() || (!updated && summary.any_actionable())
}
