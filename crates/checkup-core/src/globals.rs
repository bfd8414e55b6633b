//! Global module store resolution.
//!
//! Mirrors how node locates globally installed modules: `NODE_PATH` wins
//! (first entry when several are configured), then the npm prefix, then
//! the platform default. An unresolvable store is fatal — reporting a
//! wrong directory as "nothing installed" would be worse.

use crate::error::CheckError;
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Resolve the global module store directory.
///
/// # Errors
/// Returns `PathResolutionFailed` when the resolved directory does not
/// exist.
pub fn resolve_global_store() -> Result<PathBuf, CheckError> {
    let path = global_store_candidate();
    if path.exists() {
        Ok(path)
    } else {
        Err(CheckError::path_resolution(path))
    }
}

fn global_store_candidate() -> PathBuf {
    if let Ok(node_path) = env::var("NODE_PATH") {
        if !node_path.trim().is_empty() {
            let mut paths = env::split_paths(&node_path);
            if let Some(first) = paths.next() {
                if paths.next().is_some() {
                    warn!("using the first of multiple paths specified in NODE_PATH");
                }
                return first;
            }
        }
    }

    if let Ok(prefix) = env::var("NPM_CONFIG_PREFIX") {
        return store_under_prefix(PathBuf::from(prefix));
    }

    default_store()
}

fn store_under_prefix(prefix: PathBuf) -> PathBuf {
    if cfg!(windows) {
        prefix.join("node_modules")
    } else {
        prefix.join("lib").join("node_modules")
    }
}

fn default_store() -> PathBuf {
    if cfg!(windows) {
        dirs_next::data_dir()
            .map(|dir| dir.join("npm").join("node_modules"))
            .unwrap_or_else(|| PathBuf::from("node_modules"))
    } else {
        // npm's default prefix
        PathBuf::from("/usr/local/lib/node_modules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use serial_test::serial;
    use tempfile::tempdir;

    fn clear_env() {
        env::remove_var("NODE_PATH");
        env::remove_var("NPM_CONFIG_PREFIX");
    }

    #[test]
    #[serial]
    fn test_node_path_single_entry() {
        clear_env();
        let dir = tempdir().unwrap();
        env::set_var("NODE_PATH", dir.path());

        assert_eq!(resolve_global_store().unwrap(), dir.path());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_node_path_multiple_entries_uses_first() {
        clear_env();
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let joined =
            env::join_paths([first.path(), second.path()]).unwrap();
        env::set_var("NODE_PATH", joined);

        assert_eq!(resolve_global_store().unwrap(), first.path());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_store_is_fatal() {
        clear_env();
        let dir = tempdir().unwrap();
        env::set_var("NODE_PATH", dir.path().join("does-not-exist"));

        let err = resolve_global_store().unwrap_err();
        assert_eq!(err.code(), codes::PATH_RESOLUTION_FAILED);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_npm_config_prefix() {
        clear_env();
        let prefix = tempdir().unwrap();
        let expected = store_under_prefix(prefix.path().to_path_buf());
        std::fs::create_dir_all(&expected).unwrap();
        env::set_var("NPM_CONFIG_PREFIX", prefix.path());

        assert_eq!(resolve_global_store().unwrap(), expected);
        clear_env();
    }
}
