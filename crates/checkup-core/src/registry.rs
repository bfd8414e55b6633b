//! npm registry client and per-package metadata resolution.
//!
//! One [`RegistryClient`] exists per invocation. It owns the process-wide
//! fetch throttle: a FIFO semaphore sized to the host's logical core count,
//! acquired around each network call and released unconditionally. Excess
//! fetches queue in submission order; none is dropped.
//!
//! A failed fetch still produces a [`RegistryInfo`] — with `error` set and
//! no version data — so a single broken package never aborts a run. That
//! state is distinguishable from a package with zero published versions,
//! where `error` stays `None`.
//!
//! Known limitation: there is no whole-run deadline and no way to cancel a
//! fetch mid-flight. A hung call holds its throttle slot until the HTTP
//! client's own timeouts fire; the remaining slots keep servicing the
//! queue.

use crate::error::CheckError;
use reqwest::Client;
use semver::Version;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override the registry URL.
pub const REGISTRY_ENV: &str = "CHECKUP_NPM_REGISTRY";

/// Registries occasionally carry malformed or placeholder releases with
/// absurd version numbers. Anything at or above this is discarded.
fn poison_threshold() -> Version {
    Version::new(8000, 0, 0)
}

/// Registry metadata for one package, fetched once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryInfo {
    /// Latest stable release, after dist-tag validation.
    pub latest: Option<Version>,
    /// The `next` dist-tag, passed through unvalidated (informational only).
    pub next: Option<String>,
    /// Published versions, ascending, de-duplicated, poison filtered.
    pub versions: Vec<Version>,
    /// Best-guess project homepage.
    pub homepage: Option<String>,
    /// Set when the fetch failed; no version data accompanies it.
    pub error: Option<String>,
}

impl RegistryInfo {
    /// Build the failure representation of a fetch.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Extract version history, dist-tags, and homepage from a packument.
    #[must_use]
    pub fn from_packument(doc: &Value) -> Self {
        let poison = poison_threshold();

        let mut versions: Vec<Version> = doc
            .get("versions")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.keys()
                    .filter_map(|k| Version::parse(k).ok())
                    .filter(|v| *v < poison)
                    .collect()
            })
            .unwrap_or_default();
        versions.sort();
        versions.dedup();

        let dist_tags = doc.get("dist-tags");
        let latest_tag = dist_tags
            .and_then(|tags| tags.get("latest"))
            .and_then(Value::as_str);
        let next = dist_tags
            .and_then(|tags| tags.get("next"))
            .and_then(Value::as_str)
            .map(String::from);

        // Trust the latest dist-tag only when it names a valid stable
        // release; a tag pointing at a withdrawn or prerelease version
        // falls back to the highest stable published version.
        let latest = latest_tag
            .and_then(|s| Version::parse(s).ok())
            .filter(|v| v.pre.is_empty())
            .or_else(|| versions.iter().rev().find(|v| v.pre.is_empty()).cloned());

        Self {
            latest,
            next,
            versions,
            homepage: best_guess_homepage(doc),
            error: None,
        }
    }
}

/// Registry client with a bounded number of in-flight fetches.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
    permits: Arc<Semaphore>,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(base_url: &str) -> Result<Self, CheckError> {
        // A trailing slash matters: Url::join replaces the last path
        // segment otherwise.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| CheckError::registry(format!("invalid registry URL '{normalized}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("checkup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CheckError::registry(format!("failed to create HTTP client: {e}")))?;

        let slots = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);

        Ok(Self {
            base_url,
            http,
            permits: Arc::new(Semaphore::new(slots)),
        })
    }

    /// Create a client using the registry URL from the environment or the
    /// npm default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, CheckError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch registry metadata for one package.
    ///
    /// Suspends until a throttle slot frees up, then until network I/O
    /// completes. Never fails: errors come back as data on the result.
    pub async fn fetch_package_info(&self, name: &str) -> RegistryInfo {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return RegistryInfo::from_error(format!("Registry error {e}")),
        };

        match self.fetch_packument(name).await {
            Ok(doc) => RegistryInfo::from_packument(&doc),
            Err(e) => RegistryInfo::from_error(e.to_string()),
        }
    }

    /// Fetch the raw packument for a package.
    async fn fetch_packument(&self, name: &str) -> Result<Value, CheckError> {
        // URL-encode the separator in scoped names
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self
            .base_url
            .join(&encoded_name)
            .map_err(|e| CheckError::registry(format!("failed to build URL for '{name}': {e}")))?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CheckError::registry(format!("package not found: {name}")));
        }

        if !response.status().is_success() {
            return Err(CheckError::registry(format!(
                "registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let doc: Value = response.json().await?;
        Ok(doc)
    }
}

/// Best-guess homepage: explicit homepage field, else the bug tracker,
/// else the source repository, each normalized to a web URL.
#[must_use]
pub fn best_guess_homepage(doc: &Value) -> Option<String> {
    let latest_tag = doc.get("dist-tags")?.get("latest")?.as_str()?;
    let data = doc.get("versions")?.get(latest_tag)?;

    if let Some(homepage) = data.get("homepage").and_then(Value::as_str) {
        return Some(homepage.to_string());
    }

    if let Some(bugs) = data
        .get("bugs")
        .and_then(|b| b.get("url"))
        .and_then(Value::as_str)
    {
        if let Some(parsed) = parse_git_url(bugs.trim()) {
            return Some(parsed);
        }
    }

    data.get("repository")
        .and_then(|r| r.get("url"))
        .and_then(Value::as_str)
        .and_then(|repo| parse_git_url(repo.trim()))
}

/// Normalize a git-ish URL (`git+https://…`, `git://…`, `git@host:path`)
/// to a plain https web URL.
#[must_use]
pub fn parse_git_url(url: &str) -> Option<String> {
    let url = url.strip_prefix("git+").unwrap_or(url);

    let web = if let Some(rest) = url.strip_prefix("git@") {
        format!("https://{}", rest.replacen(':', "/", 1))
    } else if let Some(rest) = url.strip_prefix("git://") {
        format!("https://{rest}")
    } else if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        return None;
    };

    Some(web.strip_suffix(".git").unwrap_or(&web).to_string())
}
