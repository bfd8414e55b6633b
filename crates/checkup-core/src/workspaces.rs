//! Workspace member discovery.
//!
//! Supports the `workspaces` field of package.json (array and yarn-style
//! object forms) and the `packages:` list of `pnpm-workspace.yaml`. The
//! yaml handling is a deliberately narrow line scanner for that one
//! format; nothing of it leaks past the returned list of member paths.

use regex_lite::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Discover workspace member directories under a root.
///
/// Returns `None` when the root declares no workspace configuration or
/// none of its patterns matches a directory containing a package.json.
/// Members come back sorted for deterministic iteration.
#[must_use]
pub fn discover_workspace_members(root: &Path) -> Option<Vec<PathBuf>> {
    let patterns = manifest_patterns(root).or_else(|| pnpm_patterns(root))?;

    let mut members: Vec<PathBuf> = Vec::new();
    for pattern in &patterns {
        // Matching on the nested package.json filters out non-package
        // directories and handles plain paths and globs alike.
        let full = root.join(pattern).join("package.json");
        let Ok(paths) = glob::glob(&full.to_string_lossy()) else {
            continue;
        };
        for manifest_path in paths.flatten() {
            if let Some(dir) = manifest_path.parent() {
                members.push(dir.to_path_buf());
            }
        }
    }

    members.sort();
    members.dedup();

    if members.is_empty() {
        None
    } else {
        Some(members)
    }
}

/// True when the directory declares workspaces but has no direct
/// dependencies of its own. Used to switch into workspace mode without a
/// flag.
#[must_use]
pub fn is_bare_workspace_root(root: &Path) -> bool {
    let Ok(content) = fs::read_to_string(root.join("package.json")) else {
        return false;
    };
    let Ok(pkg) = serde_json::from_str::<Value>(&content) else {
        return false;
    };

    let has_workspaces = workspace_field_patterns(&pkg).is_some()
        || root.join("pnpm-workspace.yaml").exists();
    if !has_workspaces {
        return false;
    }

    let dep_count = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|s| pkg.get(*s).and_then(Value::as_object))
        .map(|section| section.len())
        .sum::<usize>();

    dep_count == 0
}

/// `workspaces` patterns from the root package.json.
fn manifest_patterns(root: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(root.join("package.json")).ok()?;
    let pkg: Value = serde_json::from_str(&content).ok()?;
    workspace_field_patterns(&pkg)
}

fn workspace_field_patterns(pkg: &Value) -> Option<Vec<String>> {
    let workspaces = pkg.get("workspaces")?;

    let arr = match workspaces {
        Value::Array(arr) => arr,
        // { "packages": ["packages/*"], "nohoist": [...] } (yarn)
        Value::Object(obj) => obj.get("packages")?.as_array()?,
        _ => return None,
    };

    let patterns: Vec<String> = arr
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    if patterns.is_empty() {
        None
    } else {
        Some(patterns)
    }
}

/// `packages:` patterns from pnpm-workspace.yaml, via a line scanner.
fn pnpm_patterns(root: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(root.join("pnpm-workspace.yaml")).ok()?;

    let key = Regex::new(r"^packages\s*:").ok()?;
    // "  - 'pattern'" with optional quotes and trailing comment
    let item = Regex::new(r##"^\s+-\s+['"]?([^'"#\r\n]+?)['"]?\s*(#.*)?$"##).ok()?;

    let mut patterns = Vec::new();
    let mut in_packages = false;

    for line in content.lines() {
        if key.is_match(line) {
            in_packages = true;
            continue;
        }

        if in_packages {
            if let Some(caps) = item.captures(line) {
                patterns.push(caps[1].trim().to_string());
            } else if !line.trim().is_empty() && !line.starts_with(char::is_whitespace) {
                // Left the packages block
                break;
            }
        }
    }

    if patterns.is_empty() {
        None
    } else {
        Some(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn add_member(root: &Path, rel: &str, name: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "{name}", "version": "1.0.0"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_discover_array_form() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join("package.json"),
            r#"{"name": "monorepo", "workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        add_member(root.path(), "packages/app", "app");
        add_member(root.path(), "packages/lib", "lib");
        // Directory without a manifest must not match
        fs::create_dir_all(root.path().join("packages").join("scratch")).unwrap();

        let members = discover_workspace_members(root.path()).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[0].ends_with("packages/app"));
        assert!(members[1].ends_with("packages/lib"));
    }

    #[test]
    fn test_discover_object_form() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join("package.json"),
            r#"{"name": "monorepo", "workspaces": {"packages": ["apps/*"], "nohoist": ["**/x"]}}"#,
        )
        .unwrap();
        add_member(root.path(), "apps/web", "web");

        let members = discover_workspace_members(root.path()).unwrap();
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_discover_pnpm_yaml() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("package.json"), r#"{"name": "monorepo"}"#).unwrap();
        fs::write(
            root.path().join("pnpm-workspace.yaml"),
            "packages:\n  - 'packages/*'   # libraries\n  - \"tools\"\nother: true\n  - not-a-member\n",
        )
        .unwrap();
        add_member(root.path(), "packages/core", "core");
        add_member(root.path(), "tools", "tools");
        add_member(root.path(), "not-a-member", "nope");

        let members = discover_workspace_members(root.path()).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|m| m.ends_with("packages/core")));
        assert!(members.iter().any(|m| m.ends_with("tools")));
    }

    #[test]
    fn test_no_workspace_config() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("package.json"), r#"{"name": "plain"}"#).unwrap();
        assert!(discover_workspace_members(root.path()).is_none());
    }

    #[test]
    fn test_bare_workspace_root_detection() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join("package.json"),
            r#"{"name": "monorepo", "workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        assert!(is_bare_workspace_root(root.path()));

        fs::write(
            root.path().join("package.json"),
            r#"{"name": "monorepo", "workspaces": ["packages/*"], "dependencies": {"lodash": "^4.0.0"}}"#,
        )
        .unwrap();
        assert!(!is_bare_workspace_root(root.path()));

        fs::write(root.path().join("package.json"), r#"{"name": "plain"}"#).unwrap();
        assert!(!is_bare_workspace_root(root.path()));
    }
}
