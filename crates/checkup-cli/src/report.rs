//! Static report driver.
//!
//! Consumes the orchestrator's result set and renders it, either as
//! marker-prefixed human lines or as a stable JSON contract.
//!
//! # JSON Contract
//!
//! - `check.schema_version` is currently `1`. Breaking changes require a bump.
//! - Top-level keys are exactly `{ "ok", "check" }`.
//! - Each root includes `{ "root", "ok", "packages" }` and, on failure,
//!   `{ "error", "error_code" }`.

use checkup_core::{PackageStatus, RequiredAction, RunSummary};
use serde::Serialize;

/// Schema version for the JSON report.
pub const CHECK_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct JsonOutput {
    ok: bool,
    check: JsonCheck,
}

#[derive(Serialize)]
struct JsonCheck {
    schema_version: u32,
    roots: Vec<JsonRoot>,
}

#[derive(Serialize)]
struct JsonRoot {
    root: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    packages: Vec<JsonPackage>,
}

#[derive(Serialize)]
struct JsonPackage {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wanted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    bump: &'static str,
    action: &'static str,
    dev: bool,
    unused: bool,
    missing_from_manifest: bool,
    mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registry_error: Option<String>,
}

impl JsonPackage {
    fn from_status(status: &PackageStatus) -> Self {
        Self {
            name: status.name.clone(),
            installed: status.installed.as_ref().map(ToString::to_string),
            declared: status.declared_range.clone(),
            wanted: status.wanted.as_ref().map(ToString::to_string),
            latest: status.registry.latest.as_ref().map(ToString::to_string),
            next: status.registry.next.clone(),
            bump: status.bump.as_str(),
            action: status.action().as_str(),
            dev: status.is_dev_dependency,
            unused: status.is_unused,
            missing_from_manifest: status.is_missing_from_manifest,
            mismatch: status.mismatch,
            homepage: status.homepage.clone(),
            registry_error: status.registry.error.clone(),
        }
    }
}

/// Render the run summary to stdout.
pub fn render(summary: &RunSummary, json: bool) {
    if json {
        render_json(summary);
    } else {
        render_human(summary);
    }
}

fn render_json(summary: &RunSummary) {
    let roots: Vec<JsonRoot> = summary
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(report) => JsonRoot {
                root: outcome.root.display().to_string(),
                ok: true,
                error: None,
                error_code: None,
                packages: report.packages.iter().map(JsonPackage::from_status).collect(),
            },
            Err(error) => JsonRoot {
                root: outcome.root.display().to_string(),
                ok: false,
                error: Some(error.to_string()),
                error_code: Some(error.code()),
                packages: Vec::new(),
            },
        })
        .collect();

    let output = JsonOutput {
        ok: !summary.any_failed(),
        check: JsonCheck {
            schema_version: CHECK_SCHEMA_VERSION,
            roots,
        },
    };

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn render_human(summary: &RunSummary) {
    let multi_root = summary.outcomes.len() > 1;
    let mut checked = 0_usize;
    let mut flagged = 0_usize;

    for outcome in &summary.outcomes {
        if multi_root {
            let line = "\u{2500}".repeat(60);
            println!();
            println!("{line}");
            println!("  Workspace: {}", outcome.root.display());
            println!("{line}");
        }

        match &outcome.result {
            Ok(report) => {
                checked += report.packages.len();
                for status in &report.packages {
                    if let Some(line) = status_line(status) {
                        println!("{line}");
                        flagged += 1;
                    }
                }
            }
            Err(error) => {
                eprintln!("! {}: {error}", outcome.root.display());
            }
        }
    }

    println!();
    if flagged == 0 && !summary.any_failed() {
        println!("{checked} packages checked. Everything is up to date.");
    } else {
        println!("{checked} packages checked, {flagged} need attention.");
        println!("Run checkup -y to update package.json to the latest versions.");
    }
}

/// One human line per package that needs attention; `None` for a package
/// in good standing.
fn status_line(status: &PackageStatus) -> Option<String> {
    if let Some(error) = &status.registry.error {
        return Some(format!("! {:<28} {error}", status.name));
    }

    let installed = status
        .installed
        .as_ref()
        .map_or_else(|| "missing".to_string(), ToString::to_string);
    let latest = status
        .registry
        .latest
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string);
    let homepage = status.homepage.as_deref().unwrap_or_default();

    let mut line = match status.action() {
        RequiredAction::None => return None,
        RequiredAction::BumpPatch | RequiredAction::BumpMinor | RequiredAction::BumpMajor => {
            format!(
                "~ {:<28} {installed} \u{2192} {latest} ({})  {homepage}",
                status.name,
                status.bump.as_str()
            )
        }
        RequiredAction::InstallMissing if status.is_missing_from_manifest => {
            format!(
                "+ {:<28} in use but not in package.json  {homepage}",
                status.name
            )
        }
        RequiredAction::InstallMissing => {
            format!("+ {:<28} not installed  {homepage}", status.name)
        }
        RequiredAction::RemoveUnused => {
            format!("- {:<28} apparently unused", status.name)
        }
    };

    if status.mismatch {
        if let Some(declared) = &status.declared_range {
            line.push_str(&format!("  (installed does not satisfy {declared})"));
        }
    }

    Some(line.trim_end().to_string())
}
