//! Non-interactive update driver (`checkup -y`).
//!
//! Rewrites the declared ranges of every outdated package to the reported
//! latest version, then tells the user which install command to run. The
//! engine's records are read-only here: after an update, a fresh run is
//! the only way to re-observe state.

use checkup_core::{rewrite_ranges, CheckupConfig, RangeChange, RequiredAction, RunSummary};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

/// One range rewrite that was applied to a manifest.
#[derive(Debug)]
pub struct AppliedChange {
    pub root: PathBuf,
    pub name: String,
    pub from: Option<String>,
    pub to: String,
}

/// Apply latest-version range rewrites for every successful root.
///
/// Only bump-classified packages are touched; missing and unused packages
/// are reported but left for the user to decide on.
pub fn apply_updates(summary: &RunSummary, config: &CheckupConfig) -> Result<Vec<AppliedChange>> {
    let mut applied = Vec::new();

    for outcome in &summary.outcomes {
        let Ok(report) = &outcome.result else {
            continue;
        };

        let mut changes = Vec::new();
        for status in &report.packages {
            let bump = matches!(
                status.action(),
                RequiredAction::BumpPatch | RequiredAction::BumpMinor | RequiredAction::BumpMajor
            );
            if !bump {
                continue;
            }
            let Some(latest) = &status.registry.latest else {
                continue;
            };

            let range = if config.save_exact {
                latest.to_string()
            } else {
                format!("^{latest}")
            };

            changes.push(RangeChange {
                name: status.name.clone(),
                range: range.clone(),
                dev: status.is_dev_dependency,
            });
            applied.push(AppliedChange {
                root: report.root.clone(),
                name: status.name.clone(),
                from: status.declared_range.clone(),
                to: range,
            });
        }

        if !changes.is_empty() {
            rewrite_ranges(&report.manifest.path, &changes).into_diagnostic()?;
        }
    }

    Ok(applied)
}

/// Tell the user what changed and what to run next.
pub fn print_applied(applied: &[AppliedChange], installer: &str) {
    if applied.is_empty() {
        println!("No dependencies to update.");
        return;
    }

    println!();
    for change in applied {
        match &change.from {
            Some(from) => println!("~ {} {} \u{2192} {}", change.name, from, change.to),
            None => println!("~ {} \u{2192} {}", change.name, change.to),
        }
    }
    println!();
    println!("package.json updated. Run `{installer} install` to apply.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkup_core::{
        read_manifest, BumpSeverity, ManifestSnapshot, PackageStatus, RegistryInfo, RootOutcome,
        RootReport,
    };
    use semver::Version;
    use std::fs;
    use tempfile::tempdir;

    fn outdated(name: &str, dev: bool) -> PackageStatus {
        PackageStatus {
            name: name.to_string(),
            installed: Some(Version::new(1, 0, 0)),
            declared_range: Some("^1.0.0".to_string()),
            wanted: Some(Version::new(1, 0, 0)),
            registry: RegistryInfo {
                latest: Some(Version::new(2, 0, 0)),
                ..RegistryInfo::default()
            },
            is_dev_dependency: dev,
            is_unused: false,
            is_missing_from_manifest: false,
            mismatch: false,
            bump: BumpSeverity::Major,
            homepage: None,
        }
    }

    #[test]
    fn test_apply_rewrites_caret_and_exact() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("package.json");
        fs::write(
            &manifest_path,
            r#"{
                "name": "app",
                "dependencies": { "lodash": "^1.0.0" },
                "devDependencies": { "jest": "^1.0.0" }
            }"#,
        )
        .unwrap();

        let manifest = ManifestSnapshot::empty(manifest_path.clone());

        let summary = RunSummary {
            outcomes: vec![RootOutcome {
                root: dir.path().to_path_buf(),
                result: Ok(RootReport {
                    root: dir.path().to_path_buf(),
                    manifest,
                    packages: vec![outdated("lodash", false), outdated("jest", true)],
                }),
            }],
        };

        let config = CheckupConfig::new(dir.path().to_path_buf());
        let applied = apply_updates(&summary, &config).unwrap();
        assert_eq!(applied.len(), 2);

        let snapshot = read_manifest(&manifest_path);
        assert_eq!(snapshot.dependencies.get("lodash").unwrap(), "^2.0.0");
        assert_eq!(snapshot.dev_dependencies.get("jest").unwrap(), "^2.0.0");

        // save-exact drops the caret
        fs::write(
            &manifest_path,
            r#"{"name": "app", "dependencies": { "lodash": "^1.0.0" }}"#,
        )
        .unwrap();
        let config = config.with_save_exact(true);
        apply_updates(&summary, &config).unwrap();
        let snapshot = read_manifest(&manifest_path);
        assert_eq!(snapshot.dependencies.get("lodash").unwrap(), "2.0.0");
    }

    #[test]
    fn test_unused_and_missing_left_alone() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("package.json");
        fs::write(
            &manifest_path,
            r#"{"name": "app", "dependencies": { "left-pad": "^1.0.0" }}"#,
        )
        .unwrap();

        let mut status = outdated("left-pad", false);
        status.is_unused = true;

        let summary = RunSummary {
            outcomes: vec![RootOutcome {
                root: dir.path().to_path_buf(),
                result: Ok(RootReport {
                    root: dir.path().to_path_buf(),
                    manifest: ManifestSnapshot::empty(manifest_path.clone()),
                    packages: vec![status],
                }),
            }],
        };

        let config = CheckupConfig::new(dir.path().to_path_buf());
        let applied = apply_updates(&summary, &config).unwrap();
        assert!(applied.is_empty());

        let snapshot = read_manifest(&manifest_path);
        assert_eq!(snapshot.dependencies.get("left-pad").unwrap(), "^1.0.0");
    }
}
