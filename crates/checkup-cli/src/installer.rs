//! Preferred package-manager detection.
//!
//! Sniffs the lockfile to pick the installer whose command we print after
//! an update. `CHECKUP_INSTALLER` forces a specific one.

use std::path::Path;

/// Environment variable to force a specific installer.
pub const INSTALLER_ENV: &str = "CHECKUP_INSTALLER";

const SUPPORTED: [&str; 4] = ["npm", "pnpm", "yarn", "ied"];

/// Detect the installer for a project root. Falls back to npm when the
/// sniffed binary is not on PATH.
pub fn detect(root: &Path) -> &'static str {
    if let Ok(forced) = std::env::var(INSTALLER_ENV) {
        if let Some(name) = SUPPORTED.iter().copied().find(|name| *name == forced) {
            return name;
        }
    }

    let sniffed = if root.join("yarn.lock").exists() {
        "yarn"
    } else if root.join("pnpm-lock.yaml").exists() {
        "pnpm"
    } else {
        "npm"
    };

    if sniffed != "npm" && which::which(sniffed).is_err() {
        return "npm";
    }

    sniffed
}
