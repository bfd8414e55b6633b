//! package.json reading and range rewriting.
//!
//! Reading never fails: a missing or unparseable manifest produces a
//! [`ManifestSnapshot`] whose `error` field is set, and the dependency maps
//! default to empty so downstream code never branches on their presence.

use crate::error::CheckError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One manifest, read at scan time, immutable thereafter.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    /// Path the snapshot was read from.
    pub path: PathBuf,
    /// Package name, when declared.
    pub name: Option<String>,
    /// Package version, when declared.
    pub version: Option<String>,
    /// Declared dependencies as name → range, sorted by name.
    pub dependencies: BTreeMap<String, String>,
    /// Declared devDependencies as name → range, sorted by name.
    pub dev_dependencies: BTreeMap<String, String>,
    /// Set when the file was missing or unparseable.
    pub error: Option<CheckError>,
}

impl ManifestSnapshot {
    /// An empty snapshot for roots that have no manifest of their own
    /// (the global module store).
    #[must_use]
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            name: None,
            version: None,
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            error: None,
        }
    }

    /// Declared range for a dependency, checking `dependencies` first.
    #[must_use]
    pub fn declared_range(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }

    /// Whether a name is declared under devDependencies.
    #[must_use]
    pub fn is_dev(&self, name: &str) -> bool {
        self.dev_dependencies.contains_key(name)
    }
}

/// Read a manifest. The error is data, not a panic or an `Err`.
#[must_use]
pub fn read_manifest(path: &Path) -> ManifestSnapshot {
    let mut snapshot = ManifestSnapshot::empty(path.to_path_buf());

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            snapshot.error = Some(CheckError::manifest_not_found(path));
            return snapshot;
        }
    };

    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(&content) else {
        snapshot.error = Some(CheckError::manifest_invalid(path));
        return snapshot;
    };

    snapshot.name = root.get("name").and_then(Value::as_str).map(String::from);
    snapshot.version = root
        .get("version")
        .and_then(Value::as_str)
        .map(String::from);
    snapshot.dependencies = read_section(&root, "dependencies");
    snapshot.dev_dependencies = read_section(&root, "devDependencies");

    snapshot
}

/// Extract a dependency section. Non-string ranges are dropped.
fn read_section(root: &serde_json::Map<String, Value>, section: &str) -> BTreeMap<String, String> {
    root.get(section)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(name, range)| {
                    range.as_str().map(|r| (name.clone(), r.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A single declared-range change for the update driver.
#[derive(Debug, Clone)]
pub struct RangeChange {
    /// Package name.
    pub name: String,
    /// New range to write (already caret- or exact-formatted).
    pub range: String,
    /// Place under devDependencies when the name is not yet declared.
    pub dev: bool,
}

/// Rewrite declared ranges in place, preserving the author's key order.
///
/// Each change lands in the section the name is already declared in;
/// undeclared names are inserted into `dependencies` (or `devDependencies`
/// when `dev` is set).
///
/// # Errors
/// Returns an error if the manifest cannot be read, parsed, or written.
pub fn rewrite_ranges(path: &Path, changes: &[RangeChange]) -> Result<(), CheckError> {
    let content =
        fs::read_to_string(path).map_err(|_| CheckError::manifest_not_found(path))?;

    let mut doc: Value =
        serde_json::from_str(&content).map_err(|_| CheckError::manifest_invalid(path))?;

    let Some(root) = doc.as_object_mut() else {
        return Err(CheckError::manifest_invalid(path));
    };

    for change in changes {
        let section = if section_has(root, "dependencies", &change.name) {
            "dependencies"
        } else if section_has(root, "devDependencies", &change.name) {
            "devDependencies"
        } else if change.dev {
            "devDependencies"
        } else {
            "dependencies"
        };

        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Some(obj) = entry.as_object_mut() {
            obj.insert(change.name.clone(), Value::String(change.range.clone()));
        }
    }

    let mut out = serde_json::to_string_pretty(&doc).map_err(CheckError::from)?;
    out.push('\n');
    fs::write(path, out).map_err(|_| CheckError::manifest_invalid(path))?;

    Ok(())
}

fn section_has(root: &serde_json::Map<String, Value>, section: &str, name: &str) -> bool {
    root.get(section)
        .and_then(Value::as_object)
        .is_some_and(|obj| obj.contains_key(name))
}
