//! Per-root run pipeline and multi-root sequencing.
//!
//! Each root moves through Scanning → AwaitingUsageOracle → Reconciling
//! and ends Done or Failed. Roots run sequentially — head-of-line, never
//! in parallel — so console interaction stays coherent and the registry
//! throttle bounds total load. One root's failure is recorded and the next
//! root still runs.

use crate::config::CheckupConfig;
use crate::error::CheckError;
use crate::installed::scan_installed;
use crate::manifest::{read_manifest, ManifestSnapshot};
use crate::reconcile::{reconcile, PackageStatus, RequiredAction};
use crate::registry::RegistryClient;
use crate::usage::UsageOracle;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pipeline phase of one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPhase {
    Scanning,
    AwaitingUsageOracle,
    Reconciling,
    Done,
    Failed,
}

impl RootPhase {
    /// Stable name for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::AwaitingUsageOracle => "awaiting-usage-oracle",
            Self::Reconciling => "reconciling",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Everything one successful root produced.
#[derive(Debug)]
pub struct RootReport {
    /// The root directory.
    pub root: PathBuf,
    /// The manifest the statuses were reconciled against.
    pub manifest: ManifestSnapshot,
    /// Reconciled statuses, in stable name order.
    pub packages: Vec<PackageStatus>,
}

/// Terminal state of one root: a report, or the error that failed it.
#[derive(Debug)]
pub struct RootOutcome {
    pub root: PathBuf,
    pub result: Result<RootReport, CheckError>,
}

/// Aggregate of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<RootOutcome>,
}

impl RunSummary {
    /// Whether any root ended in Failed.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_err())
    }

    /// Whether any package in any successful root needs attention.
    #[must_use]
    pub fn any_actionable(&self) -> bool {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .flat_map(|report| report.packages.iter())
            .any(|status| status.action() != RequiredAction::None)
    }
}

/// Run the pipeline for a single root.
///
/// # Errors
/// Returns the root-fatal error: unreadable manifest, usage-oracle
/// failure. Per-package registry failures are data on the report.
pub async fn run_root<O: UsageOracle>(
    config: &CheckupConfig,
    root: &Path,
    registry: &RegistryClient,
    oracle: &O,
) -> Result<RootReport, CheckError> {
    debug!(
        phase = RootPhase::Scanning.as_str(),
        root = %root.display(),
        "phase"
    );

    // The scanner and the manifest reader are independent; overlap them.
    let store = if config.global {
        root.to_path_buf()
    } else {
        root.join("node_modules")
    };
    let scan_task = tokio::task::spawn_blocking(move || scan_installed(&store));

    let manifest = if config.global {
        ManifestSnapshot::empty(root.join("package.json"))
    } else {
        read_manifest(&root.join("package.json"))
    };

    let installed = scan_task.await.unwrap_or_default();

    if let Some(error) = &manifest.error {
        return Err(error.clone());
    }

    debug!(phase = RootPhase::AwaitingUsageOracle.as_str(), "phase");
    let usage = oracle.analyze(root).await?;

    debug!(
        phase = RootPhase::Reconciling.as_str(),
        installed = installed.len(),
        unused = usage.unused.len(),
        missing = usage.missing.len(),
        "phase"
    );
    let packages = reconcile(config, &manifest, &installed, &usage, registry).await?;

    Ok(RootReport {
        root: root.to_path_buf(),
        manifest,
        packages,
    })
}

/// Run every root in order, isolating failures per root.
pub async fn run_many<O: UsageOracle>(
    config: &CheckupConfig,
    roots: &[PathBuf],
    registry: &RegistryClient,
    oracle: &O,
) -> RunSummary {
    let mut outcomes = Vec::with_capacity(roots.len());

    for root in roots {
        info!(root = %root.display(), "checking");
        let result = run_root(config, root, registry, oracle).await;

        match &result {
            Ok(report) => debug!(
                phase = RootPhase::Done.as_str(),
                packages = report.packages.len(),
                "phase"
            ),
            Err(error) => warn!(
                phase = RootPhase::Failed.as_str(),
                code = error.code(),
                error = %error,
                "root failed"
            ),
        }

        outcomes.push(RootOutcome {
            root: root.clone(),
            result,
        });
    }

    RunSummary { outcomes }
}
