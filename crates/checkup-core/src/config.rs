//! Runtime configuration for a checkup invocation.
//!
//! One strongly-typed value, constructed at startup and passed by reference
//! through every stage. Fields that only drive the usage oracle (`specials`)
//! are carried as opaque strings and never interpreted here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which dependency sections of the manifest are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepScope {
    /// dependencies and devDependencies.
    #[default]
    All,
    /// dependencies only (`--production`).
    Production,
    /// devDependencies only (`--dev-only`).
    DevOnly,
}

/// Configuration for a checkup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckupConfig {
    /// Directory being audited. In global mode this is the module store.
    pub cwd: PathBuf,

    /// Audit globally installed modules instead of a project.
    pub global: bool,

    /// Dependency sections to audit.
    pub scope: DepScope,

    /// Skip the unused-dependency check.
    pub skip_unused: bool,

    /// Write exact versions (x.y.z) instead of caret ranges on update.
    pub save_exact: bool,

    /// Glob patterns of package names excluded from reconciliation.
    pub ignore: Vec<String>,

    /// depcheck "specials" identifiers, passed through to the usage oracle.
    pub specials: Vec<String>,
}

impl Default for CheckupConfig {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            global: false,
            scope: DepScope::default(),
            skip_unused: false,
            save_exact: false,
            ignore: Vec::new(),
            specials: Vec::new(),
        }
    }
}

impl CheckupConfig {
    /// Create a new config rooted at the given directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Audit global modules.
    #[must_use]
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Select dependency sections.
    #[must_use]
    pub fn with_scope(mut self, scope: DepScope) -> Self {
        self.scope = scope;
        self
    }

    /// Skip the unused-dependency check.
    #[must_use]
    pub fn with_skip_unused(mut self, skip: bool) -> Self {
        self.skip_unused = skip;
        self
    }

    /// Write exact versions on update.
    #[must_use]
    pub fn with_save_exact(mut self, exact: bool) -> Self {
        self.save_exact = exact;
        self
    }

    /// Set ignore globs.
    #[must_use]
    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Set depcheck specials.
    #[must_use]
    pub fn with_specials(mut self, specials: Vec<String>) -> Self {
        self.specials = specials;
        self
    }
}
