//! Declared-vs-used dependency analysis, consumed from an external oracle.
//!
//! The engine performs no static analysis itself. It needs exactly two
//! facts per root, computed before reconciliation: which declared names are
//! apparently unused, and which names are imported somewhere but missing
//! from the manifest. The depcheck CLI supplies both; its configuration
//! knobs (`ignores`, `specials`) are opaque strings passed straight
//! through.

use crate::error::CheckError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::process::Command;

/// What the usage oracle reports for one root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageReport {
    /// Declared in the manifest but apparently never imported.
    pub unused: BTreeSet<String>,
    /// Imported somewhere but missing from the manifest, with the range to
    /// assume for it.
    pub missing: BTreeMap<String, String>,
}

/// A source of usage facts. Implementations may shell out, read a cache,
/// or return nothing at all.
pub trait UsageOracle {
    /// Analyze one root. A failure here is fatal for that root only.
    fn analyze(
        &self,
        root: &Path,
    ) -> impl std::future::Future<Output = Result<UsageReport, CheckError>>;
}

/// Oracle for `--skip-unused` and global mode: reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUsage;

impl UsageOracle for DisabledUsage {
    async fn analyze(&self, _root: &Path) -> Result<UsageReport, CheckError> {
        Ok(UsageReport::default())
    }
}

/// Oracle backed by the depcheck CLI, invoked as `npx depcheck --json`.
#[derive(Debug, Clone, Default)]
pub struct DepcheckOracle {
    /// Name globs depcheck should ignore.
    pub ignores: Vec<String>,
    /// depcheck "specials" identifiers (build-tool usage idioms).
    pub specials: Vec<String>,
}

impl DepcheckOracle {
    /// Create an oracle with the given pass-through configuration.
    #[must_use]
    pub fn new(ignores: Vec<String>, specials: Vec<String>) -> Self {
        Self { ignores, specials }
    }
}

impl UsageOracle for DepcheckOracle {
    async fn analyze(&self, root: &Path) -> Result<UsageReport, CheckError> {
        let mut cmd = Command::new("npx");
        cmd.arg("depcheck").arg(root).arg("--json");
        if !self.ignores.is_empty() {
            cmd.arg(format!("--ignores={}", self.ignores.join(",")));
        }
        if !self.specials.is_empty() {
            cmd.arg(format!("--specials={}", self.specials.join(",")));
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| CheckError::usage_oracle(format!("failed to launch depcheck: {e}")))?;

        // depcheck exits nonzero whenever it finds issues; judge the run by
        // whether its JSON output parses, not by the exit code.
        parse_depcheck_output(&output.stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.trim().is_empty() {
                e
            } else {
                CheckError::usage_oracle(format!("depcheck failed: {}", stderr.trim()))
            }
        })
    }
}

/// Parse depcheck's `--json` output into a [`UsageReport`].
///
/// depcheck reports where a missing package is imported from, not what
/// version is wanted; `*` is assumed as the range for those.
fn parse_depcheck_output(stdout: &[u8]) -> Result<UsageReport, CheckError> {
    let doc: Value = serde_json::from_slice(stdout)
        .map_err(|e| CheckError::usage_oracle(format!("unreadable depcheck output: {e}")))?;

    let mut report = UsageReport::default();

    for section in ["dependencies", "devDependencies"] {
        if let Some(names) = doc.get(section).and_then(Value::as_array) {
            for name in names.iter().filter_map(Value::as_str) {
                report.unused.insert(name.to_string());
            }
        }
    }

    if let Some(missing) = doc.get("missing").and_then(Value::as_object) {
        for name in missing.keys() {
            report.missing.insert(name.clone(), "*".to_string());
        }
    }

    Ok(report)
}
