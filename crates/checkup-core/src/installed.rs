//! Installed-package scanning.
//!
//! A package store (`node_modules/` or the global module store) lays
//! packages out exactly two levels deep: `store/name/package.json` and
//! `store/@scope/name/package.json`. The scan reads name and version out of
//! each nested manifest; anything unreadable is treated as not installed.
//! Scanning never fails the run.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Mapping of package name → installed version, built once per scan root.
pub type InstalledPackages = BTreeMap<String, String>;

/// Scan a package store for installed packages.
///
/// A missing store directory yields an empty map (nothing installed).
#[must_use]
pub fn scan_installed(store: &Path) -> InstalledPackages {
    let mut installed = InstalledPackages::new();

    let Ok(entries) = fs::read_dir(store) else {
        return installed;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        if name.starts_with('@') {
            // Scoped packages sit one level deeper: store/@scope/name
            let Ok(scope_entries) = fs::read_dir(&path) else {
                continue;
            };
            for scoped in scope_entries.flatten() {
                record_package(&scoped.path(), &mut installed);
            }
        } else {
            record_package(&path, &mut installed);
        }
    }

    installed
}

/// Read name and version from one package directory; skip on any failure.
fn record_package(dir: &Path, installed: &mut InstalledPackages) {
    if !dir.is_dir() {
        return;
    }

    let Ok(content) = fs::read_to_string(dir.join("package.json")) else {
        return;
    };
    let Ok(pkg) = serde_json::from_str::<Value>(&content) else {
        return;
    };

    let Some(name) = pkg.get("name").and_then(Value::as_str) else {
        return;
    };
    let version = pkg
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default();

    installed.insert(name.to_string(), version.to_string());
}
