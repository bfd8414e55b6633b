//! Error types for checkup runs.
//!
//! Package-level registry failures are never represented here — they are
//! carried as data on [`crate::registry::RegistryInfo`] so that one broken
//! package cannot abort a run. `CheckError` covers the failures that end a
//! root: unreadable manifests, unresolvable global paths, a dead usage
//! oracle.

use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes surfaced in JSON output.
pub mod codes {
    pub const MANIFEST_NOT_FOUND: &str = "MANIFEST_NOT_FOUND";
    pub const MANIFEST_INVALID: &str = "MANIFEST_INVALID";
    pub const REGISTRY_FETCH_FAILED: &str = "REGISTRY_FETCH_FAILED";
    pub const PATH_RESOLUTION_FAILED: &str = "PATH_RESOLUTION_FAILED";
    pub const USAGE_ORACLE_FAILED: &str = "USAGE_ORACLE_FAILED";
    pub const WORKSPACES_NOT_FOUND: &str = "WORKSPACES_NOT_FOUND";
}

/// Error type for checkup operations.
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    #[error("A package.json was not found at {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("A package.json was found at {path}, but it is not valid")]
    ManifestInvalid { path: PathBuf },

    #[error("Registry error {message}")]
    RegistryFetchFailed { message: String },

    #[error("Path \"{path}\" does not exist. Please check the NODE_PATH environment variable.")]
    PathResolutionFailed { path: PathBuf },

    #[error("Unused-dependency check failed: {message}")]
    UsageOracleFailed { message: String },

    #[error("No workspace packages found below {root}")]
    WorkspacesNotFound { root: PathBuf },
}

impl CheckError {
    /// Get the stable error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } => codes::MANIFEST_NOT_FOUND,
            Self::ManifestInvalid { .. } => codes::MANIFEST_INVALID,
            Self::RegistryFetchFailed { .. } => codes::REGISTRY_FETCH_FAILED,
            Self::PathResolutionFailed { .. } => codes::PATH_RESOLUTION_FAILED,
            Self::UsageOracleFailed { .. } => codes::USAGE_ORACLE_FAILED,
            Self::WorkspacesNotFound { .. } => codes::WORKSPACES_NOT_FOUND,
        }
    }

    /// Create a manifest-not-found error.
    #[must_use]
    pub fn manifest_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }

    /// Create a manifest-invalid error.
    #[must_use]
    pub fn manifest_invalid(path: impl Into<PathBuf>) -> Self {
        Self::ManifestInvalid { path: path.into() }
    }

    /// Create a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::RegistryFetchFailed {
            message: message.into(),
        }
    }

    /// Create a path-resolution error (global mode).
    #[must_use]
    pub fn path_resolution(path: impl Into<PathBuf>) -> Self {
        Self::PathResolutionFailed { path: path.into() }
    }

    /// Create a usage-oracle error.
    pub fn usage_oracle(message: impl Into<String>) -> Self {
        Self::UsageOracleFailed {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::registry(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::registry(format!("connection failed: {e}"))
        } else {
            Self::registry(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CheckError {
    fn from(e: serde_json::Error) -> Self {
        Self::registry(format!("invalid JSON: {e}"))
    }
}
