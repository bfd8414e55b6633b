//! npm version-range handling on top of `semver`.
//!
//! The registry and manifests speak npm range syntax, which is a superset of
//! what [`semver::VersionReq`] parses: hyphen ranges (`1.0.0 - 2.0.0`),
//! space-separated AND comparators (`>= 2.1.2 < 3.0.0`), OR alternatives
//! (`^1.0.0 || ^2.0.0`), and an empty range meaning "anything". This module
//! normalizes those forms; it deliberately stops at "does this version
//! satisfy" and "what is the highest satisfying version".

use semver::{Version, VersionReq};

/// Parse an npm range into its OR alternatives.
///
/// Returns `None` when no alternative is parseable (git URLs, `file:`
/// specifiers, tags). Unparseable alternatives inside an otherwise valid OR
/// range are skipped.
#[must_use]
pub fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    let reqs: Vec<VersionReq> = range
        .split("||")
        .filter_map(|alt| parse_single(alt.trim()))
        .collect();

    if reqs.is_empty() {
        None
    } else {
        Some(reqs)
    }
}

/// Whether a declared range is usable for reconciliation.
#[must_use]
pub fn valid_range(range: &str) -> bool {
    parse_range(range).is_some()
}

/// Whether `version` satisfies the npm range.
#[must_use]
pub fn satisfies(version: &Version, range: &str) -> bool {
    parse_range(range)
        .map(|reqs| reqs.iter().any(|req| req.matches(version)))
        .unwrap_or(false)
}

/// Highest version in an ascending-sorted slice satisfying the range.
#[must_use]
pub fn max_satisfying<'a>(versions: &'a [Version], range: &str) -> Option<&'a Version> {
    let reqs = parse_range(range)?;
    versions
        .iter()
        .rev()
        .find(|v| reqs.iter().any(|req| req.matches(v)))
}

/// Parse one alternative, normalizing npm-only syntax.
fn parse_single(range: &str) -> Option<VersionReq> {
    // npm treats an empty range as "anything"
    if range.is_empty() {
        return Some(VersionReq::STAR);
    }

    // Hyphen ranges: "1.0.0 - 2.0.0" means ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = range.split_once(" - ") {
        let start = start.trim();
        let end = end.trim();
        if !start.is_empty() && !end.is_empty() {
            return VersionReq::parse(&format!(">={start}, <={end}")).ok();
        }
    }

    // npm allows space-separated comparators to mean AND;
    // semver wants commas between them.
    VersionReq::parse(&normalize_comparators(range)).ok()
}

/// Join whitespace-separated comparators with commas, reattaching bare
/// operators (`>=` alone) to the version token that follows them.
fn normalize_comparators(range: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    for token in range.split_whitespace() {
        let continues_previous = parts
            .last()
            .is_some_and(|prev: &String| !prev.chars().any(|c| c.is_ascii_digit() || c == '*'));
        if continues_previous {
            if let Some(prev) = parts.last_mut() {
                prev.push_str(token);
                continue;
            }
        }
        parts.push(token.to_string());
    }

    parts.join(", ")
}
