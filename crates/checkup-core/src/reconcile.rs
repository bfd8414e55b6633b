//! The reconciliation engine.
//!
//! For every candidate dependency name — declared in the manifest, found in
//! the package store, or flagged by the usage oracle — this merges installed
//! version, declared range, registry metadata, and usage verdicts into one
//! [`PackageStatus`], and classifies how far behind the installed version
//! is. The merge itself is pure; the only suspension point is the registry
//! fetch, and a failed fetch surfaces on that package's own record instead
//! of aborting its siblings.

use crate::config::{CheckupConfig, DepScope};
use crate::error::CheckError;
use crate::installed::InstalledPackages;
use crate::manifest::ManifestSnapshot;
use crate::ranges::{max_satisfying, satisfies, valid_range};
use crate::registry::{RegistryClient, RegistryInfo};
use crate::usage::UsageReport;
use futures::future::join_all;
use glob::Pattern;
use semver::Version;
use std::collections::BTreeMap;

/// How large the jump from installed to latest is, by semver field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpSeverity {
    /// Installed matches latest.
    None,
    /// Patch (or prerelease) fields differ.
    Patch,
    /// Minor fields differ.
    Minor,
    /// Major fields differ.
    Major,
    /// Nothing installed, or the registry fetch failed.
    Unknown,
}

impl BumpSeverity {
    /// Stable lowercase name for output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Unknown => "unknown",
        }
    }
}

/// The remedy a record calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAction {
    None,
    BumpPatch,
    BumpMinor,
    BumpMajor,
    InstallMissing,
    RemoveUnused,
}

impl RequiredAction {
    /// Stable kebab-case name for output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BumpPatch => "bump-patch",
            Self::BumpMinor => "bump-minor",
            Self::BumpMajor => "bump-major",
            Self::InstallMissing => "install-missing",
            Self::RemoveUnused => "remove-unused",
        }
    }
}

/// One reconciled dependency. Created once per run, never mutated after
/// the engine returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageStatus {
    /// Package name.
    pub name: String,
    /// Installed version, when present in the scan.
    pub installed: Option<Version>,
    /// Declared range from the manifest, when declared.
    pub declared_range: Option<String>,
    /// Highest published version satisfying the declared range.
    pub wanted: Option<Version>,
    /// Registry metadata (or its failure representation).
    pub registry: RegistryInfo,
    /// Declared under devDependencies.
    pub is_dev_dependency: bool,
    /// Flagged unused by the usage oracle.
    pub is_unused: bool,
    /// In use (or installed) but not declared in the manifest.
    pub is_missing_from_manifest: bool,
    /// Installed version does not satisfy the declared range.
    pub mismatch: bool,
    /// Severity of the installed → latest jump.
    pub bump: BumpSeverity,
    /// Best-guess homepage, from the registry.
    pub homepage: Option<String>,
}

impl PackageStatus {
    /// Classify the action this record calls for.
    #[must_use]
    pub fn action(&self) -> RequiredAction {
        if self.is_unused {
            return RequiredAction::RemoveUnused;
        }
        if self.installed.is_none() || self.is_missing_from_manifest {
            return RequiredAction::InstallMissing;
        }
        match self.bump {
            BumpSeverity::Major => RequiredAction::BumpMajor,
            BumpSeverity::Minor => RequiredAction::BumpMinor,
            BumpSeverity::Patch => RequiredAction::BumpPatch,
            BumpSeverity::None | BumpSeverity::Unknown => RequiredAction::None,
        }
    }
}

/// Derive bump severity by semver field comparison against registry latest.
#[must_use]
pub fn bump_severity(installed: Option<&Version>, registry: &RegistryInfo) -> BumpSeverity {
    let Some(installed) = installed else {
        return BumpSeverity::Unknown;
    };
    if registry.error.is_some() {
        return BumpSeverity::Unknown;
    }
    let Some(latest) = &registry.latest else {
        return BumpSeverity::Unknown;
    };

    if installed == latest {
        BumpSeverity::None
    } else if installed.major != latest.major {
        BumpSeverity::Major
    } else if installed.minor != latest.minor {
        BumpSeverity::Minor
    } else {
        // patch or prerelease difference
        BumpSeverity::Patch
    }
}

/// A dependency name selected for reconciliation, with everything known
/// about it before the registry is consulted.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    declared: Option<String>,
    /// Declared range, or the range the usage oracle inferred for a
    /// missing package. Drives the `wanted` computation.
    effective_range: Option<String>,
    is_dev: bool,
    installed: Option<Version>,
    is_unused: bool,
    is_missing: bool,
}

/// Build the candidate set: declared names (per mode selection) ∪ names the
/// usage oracle found missing. Sorted by name, which fixes result order.
fn build_candidates(
    config: &CheckupConfig,
    manifest: &ManifestSnapshot,
    installed: &InstalledPackages,
    usage: &UsageReport,
) -> Vec<Candidate> {
    // name → (declared range, is dev)
    let mut selected: BTreeMap<String, (Option<String>, bool)> = BTreeMap::new();

    if config.global {
        for name in installed.keys() {
            selected.insert(name.clone(), (None, false));
        }
    } else {
        if config.scope != DepScope::Production {
            for (name, range) in &manifest.dev_dependencies {
                selected.insert(name.clone(), (Some(range.clone()), true));
            }
        }
        if config.scope != DepScope::DevOnly {
            for (name, range) in &manifest.dependencies {
                selected.insert(name.clone(), (Some(range.clone()), manifest.is_dev(name)));
            }
        }
    }

    for name in usage.missing.keys() {
        selected.entry(name.clone()).or_insert((None, false));
    }

    let ignore: Vec<Pattern> = config
        .ignore
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect();

    selected
        .into_iter()
        .filter(|(name, _)| !ignore.iter().any(|p| p.matches(name)))
        .filter_map(|(name, (declared, is_dev))| {
            // Declared ranges that aren't semver ranges (git URLs, file:
            // specifiers) are not reconcilable; leave those packages alone.
            if let Some(range) = &declared {
                if !valid_range(range) {
                    return None;
                }
            }

            let effective_range = declared
                .clone()
                .or_else(|| usage.missing.get(&name).cloned());

            Some(Candidate {
                installed: installed
                    .get(&name)
                    .and_then(|raw| Version::parse(raw).ok()),
                is_unused: usage.unused.contains(&name),
                is_missing: declared.is_none() && usage.missing.contains_key(&name),
                declared,
                effective_range,
                is_dev,
                name,
            })
        })
        .collect()
}

/// Merge one candidate with its registry metadata. Pure.
fn build_status(candidate: Candidate, info: RegistryInfo) -> PackageStatus {
    let wanted = candidate
        .effective_range
        .as_deref()
        .and_then(|range| max_satisfying(&info.versions, range))
        .cloned();

    let mismatch = match (&candidate.installed, candidate.declared.as_deref()) {
        (Some(version), Some(range)) => !satisfies(version, range),
        _ => false,
    };

    let bump = bump_severity(candidate.installed.as_ref(), &info);

    PackageStatus {
        name: candidate.name,
        installed: candidate.installed,
        declared_range: candidate.declared,
        wanted,
        homepage: info.homepage.clone(),
        registry: info,
        is_dev_dependency: candidate.is_dev,
        is_unused: candidate.is_unused,
        is_missing_from_manifest: candidate.is_missing,
        mismatch,
        bump,
    }
}

/// Reconcile one root.
///
/// Fans out one registry fetch per candidate — bounded by the client's
/// throttle — and joins them all before returning, so one package's
/// failure never discards another's result. Results come back in
/// candidate (name) order.
///
/// # Errors
/// A manifest-load error received as input short-circuits the whole root;
/// per-package registry failures do not.
pub async fn reconcile(
    config: &CheckupConfig,
    manifest: &ManifestSnapshot,
    installed: &InstalledPackages,
    usage: &UsageReport,
    registry: &RegistryClient,
) -> Result<Vec<PackageStatus>, CheckError> {
    if let Some(error) = &manifest.error {
        return Err(error.clone());
    }

    let candidates = build_candidates(config, manifest, installed, usage);
    tracing::debug!(candidates = candidates.len(), "reconciling dependencies");

    let statuses = join_all(candidates.into_iter().map(|candidate| async move {
        let info = registry.fetch_package_info(&candidate.name).await;
        build_status(candidate, info)
    }))
    .await;

    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn info_with(versions: &[&str], latest: &str) -> RegistryInfo {
        RegistryInfo {
            latest: Some(v(latest)),
            next: None,
            versions: versions.iter().map(|s| v(s)).collect(),
            homepage: None,
            error: None,
        }
    }

    fn manifest_with(deps: &[(&str, &str)], dev: &[(&str, &str)]) -> ManifestSnapshot {
        let mut snapshot = ManifestSnapshot::empty(PathBuf::from("/app/package.json"));
        snapshot.dependencies = deps
            .iter()
            .map(|(n, r)| ((*n).to_string(), (*r).to_string()))
            .collect();
        snapshot.dev_dependencies = dev
            .iter()
            .map(|(n, r)| ((*n).to_string(), (*r).to_string()))
            .collect();
        snapshot
    }

    fn candidate(name: &str, declared: Option<&str>, installed: Option<&str>) -> Candidate {
        Candidate {
            name: name.to_string(),
            declared: declared.map(String::from),
            effective_range: declared.map(String::from),
            is_dev: false,
            installed: installed.map(v),
            is_unused: false,
            is_missing: false,
        }
    }

    #[test]
    fn test_bump_severity_grid() {
        let latest = |s| info_with(&[s], s);

        assert_eq!(
            bump_severity(Some(&v("1.2.3")), &latest("1.2.3")),
            BumpSeverity::None
        );
        assert_eq!(
            bump_severity(Some(&v("1.2.3")), &latest("2.2.3")),
            BumpSeverity::Major
        );
        assert_eq!(
            bump_severity(Some(&v("1.2.3")), &latest("1.3.3")),
            BumpSeverity::Minor
        );
        assert_eq!(
            bump_severity(Some(&v("1.2.3")), &latest("1.2.4")),
            BumpSeverity::Patch
        );
    }

    #[test]
    fn test_bump_severity_unknown_cases() {
        assert_eq!(
            bump_severity(None, &info_with(&["2.0.0"], "2.0.0")),
            BumpSeverity::Unknown
        );
        assert_eq!(
            bump_severity(
                Some(&v("1.0.0")),
                &RegistryInfo::from_error("Registry error timeout")
            ),
            BumpSeverity::Unknown
        );
    }

    #[test]
    fn test_current_package_needs_nothing() {
        // left-pad: declared ^1.0.0, installed 1.2.0, latest 1.2.0
        let status = build_status(
            candidate("left-pad", Some("^1.0.0"), Some("1.2.0")),
            info_with(&["1.0.0", "1.2.0"], "1.2.0"),
        );

        assert_eq!(status.installed, Some(v("1.2.0")));
        assert_eq!(status.bump, BumpSeverity::None);
        assert_eq!(status.wanted, Some(v("1.2.0")));
        assert!(!status.mismatch);
        assert_eq!(status.action(), RequiredAction::None);
    }

    #[test]
    fn test_declared_but_not_installed() {
        let status = build_status(
            candidate("foo", Some("^1.0.0"), None),
            info_with(&["1.0.0", "2.0.0"], "2.0.0"),
        );

        assert!(status.installed.is_none());
        assert_eq!(status.bump, BumpSeverity::Unknown);
        assert_eq!(status.wanted, Some(v("1.0.0")));
        assert_eq!(status.action(), RequiredAction::InstallMissing);
    }

    #[test]
    fn test_missing_from_manifest() {
        let config = CheckupConfig::new(PathBuf::from("/app"));
        let manifest = manifest_with(&[], &[]);
        let installed = InstalledPackages::from([("bar".to_string(), "1.0.0".to_string())]);
        let usage = UsageReport {
            unused: BTreeSet::new(),
            missing: BTreeMap::from([("bar".to_string(), "*".to_string())]),
        };

        let candidates = build_candidates(&config, &manifest, &installed, &usage);
        assert_eq!(candidates.len(), 1);

        let status = build_status(
            candidates.into_iter().next().unwrap(),
            info_with(&["1.0.0", "1.1.0"], "1.1.0"),
        );

        assert!(status.is_missing_from_manifest);
        assert!(status.declared_range.is_none());
        assert_eq!(status.installed, Some(v("1.0.0")));
        assert_eq!(status.wanted, Some(v("1.1.0")));
        assert_eq!(status.action(), RequiredAction::InstallMissing);
    }

    #[test]
    fn test_unused_wins_regardless_of_version_state() {
        let mut c = candidate("baz", Some("^1.0.0"), Some("1.0.0"));
        c.is_unused = true;

        let status = build_status(c, info_with(&["1.0.0", "2.0.0"], "2.0.0"));

        assert!(status.is_unused);
        assert_eq!(status.bump, BumpSeverity::Major);
        assert_eq!(status.action(), RequiredAction::RemoveUnused);
    }

    #[test]
    fn test_mismatch_flagged() {
        let status = build_status(
            candidate("qux", Some("^2.0.0"), Some("1.0.0")),
            info_with(&["1.0.0", "2.0.0"], "2.0.0"),
        );

        assert!(status.mismatch);
        assert_eq!(status.bump, BumpSeverity::Major);
    }

    #[test]
    fn test_registry_error_yields_unknown_with_error_set() {
        let status = build_status(
            candidate("flaky", Some("^1.0.0"), Some("1.0.0")),
            RegistryInfo::from_error("Registry error socket hang up"),
        );

        assert!(status.registry.error.is_some());
        assert_eq!(status.bump, BumpSeverity::Unknown);
        assert_eq!(status.action(), RequiredAction::None);
    }

    #[test]
    fn test_scope_selection() {
        let manifest = manifest_with(&[("prod", "^1.0.0")], &[("dev", "^1.0.0")]);
        let installed = InstalledPackages::new();
        let usage = UsageReport::default();

        let base = CheckupConfig::new(PathBuf::from("/app"));

        let names = |config: &CheckupConfig| {
            build_candidates(config, &manifest, &installed, &usage)
                .into_iter()
                .map(|c| c.name)
                .collect::<Vec<_>>()
        };

        assert_eq!(names(&base), vec!["dev", "prod"]);
        assert_eq!(
            names(&base.clone().with_scope(DepScope::Production)),
            vec!["prod"]
        );
        assert_eq!(
            names(&base.clone().with_scope(DepScope::DevOnly)),
            vec!["dev"]
        );
    }

    #[test]
    fn test_dev_flag_set_for_dev_dependencies() {
        let manifest = manifest_with(&[], &[("jest", "^29.0.0")]);
        let candidates = build_candidates(
            &CheckupConfig::new(PathBuf::from("/app")),
            &manifest,
            &InstalledPackages::new(),
            &UsageReport::default(),
        );

        assert!(candidates[0].is_dev);
    }

    #[test]
    fn test_ignore_globs_skip_candidates() {
        let manifest = manifest_with(
            &[("@types/node", "^20.0.0"), ("lodash", "^4.0.0")],
            &[],
        );
        let config = CheckupConfig::new(PathBuf::from("/app"))
            .with_ignore(vec!["@types/*".to_string()]);

        let candidates = build_candidates(
            &config,
            &manifest,
            &InstalledPackages::new(),
            &UsageReport::default(),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "lodash");
    }

    #[test]
    fn test_non_semver_ranges_skipped() {
        let manifest = manifest_with(
            &[
                ("pinned-fork", "git+https://github.com/user/fork.git"),
                ("lodash", "^4.0.0"),
            ],
            &[],
        );

        let candidates = build_candidates(
            &CheckupConfig::new(PathBuf::from("/app")),
            &manifest,
            &InstalledPackages::new(),
            &UsageReport::default(),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "lodash");
    }

    #[test]
    fn test_global_mode_candidates_come_from_store() {
        let config = CheckupConfig::new(PathBuf::from("/usr/lib/node_modules")).with_global(true);
        let manifest = ManifestSnapshot::empty(PathBuf::from("/usr/lib/node_modules"));
        let installed = InstalledPackages::from([
            ("npm".to_string(), "10.2.0".to_string()),
            ("typescript".to_string(), "5.3.3".to_string()),
        ]);

        let candidates =
            build_candidates(&config, &manifest, &installed, &UsageReport::default());

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["npm", "typescript"]);
        assert!(candidates.iter().all(|c| c.declared.is_none()));
        assert_eq!(candidates[0].installed, Some(v("10.2.0")));
    }

    #[test]
    fn test_reconciliation_is_deterministic() {
        let c = candidate("lodash", Some("^4.0.0"), Some("4.17.20"));
        let info = info_with(&["4.17.20", "4.17.21"], "4.17.21");

        let first = build_status(c.clone(), info.clone());
        let second = build_status(c, info);

        assert_eq!(first, second);
        assert_eq!(first.bump, BumpSeverity::Patch);
    }
}
