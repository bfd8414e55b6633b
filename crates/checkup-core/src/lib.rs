#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Core engine for checkup.
//!
//! Audits a project's package.json against two other sources of truth —
//! what is installed in the package store and what the npm registry
//! publishes — and reconciles the three into one status record per
//! dependency. Presentation and update drivers consume those records;
//! nothing here writes back into them.

pub mod config;
pub mod error;
pub mod globals;
pub mod installed;
pub mod manifest;
pub mod orchestrator;
pub mod ranges;
pub mod reconcile;
pub mod registry;
pub mod usage;
pub mod workspaces;

pub use config::{CheckupConfig, DepScope};
pub use error::CheckError;
pub use globals::resolve_global_store;
pub use installed::{scan_installed, InstalledPackages};
pub use manifest::{read_manifest, rewrite_ranges, ManifestSnapshot, RangeChange};
pub use orchestrator::{run_many, run_root, RootOutcome, RootPhase, RootReport, RunSummary};
pub use reconcile::{reconcile, BumpSeverity, PackageStatus, RequiredAction};
pub use registry::{RegistryClient, RegistryInfo, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use usage::{DepcheckOracle, DisabledUsage, UsageOracle, UsageReport};
pub use workspaces::{discover_workspace_members, is_bare_workspace_root};

/// Crate version, surfaced in the CLI and the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
