//! Release branch grammar.
//!
//! A release branch is:
//! - `v` followed by one or more dot-separated runs of ASCII digits
//!   (`v1`, `v1.2`, `v10.0.3`)
//! - optionally followed by `-` and one or more characters from
//!   `[A-Za-z0-9._-]` (`-beta`, `-rc.1`, `-hotfix-2`)
//!
//! Anything else (`main`, `release-candidate`, `v1.`, `v1.2-`) is not a
//! release branch and parses to the fixed fallback `v0.0`.

use serde::{Deserialize, Serialize};

/// Git prefix for branch refs, e.g. in `GITHUB_REF`.
const HEADS_PREFIX: &str = "refs/heads/";

/// The parts of a release branch name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionParts {
    /// `v` plus the numeric version, e.g. `v1.2`.
    pub prefix: String,
    /// Dot-separated integers, e.g. `1.2`.
    pub numeric: String,
    /// Empty, or `-` followed by the channel name, e.g. `-beta`.
    pub suffix: String,
}

impl VersionParts {
    /// The parts used for branches outside the release grammar.
    pub fn fallback() -> Self {
        Self {
            prefix: "v0.0".into(),
            numeric: "0.0".into(),
            suffix: String::new(),
        }
    }

    /// Returns `true` if these are the fallback parts.
    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// The full version string for a build: `{prefix}.{build_number}{suffix}`.
    pub fn full_version(&self, build_number: u64) -> String {
        format!("{}.{}{}", self.prefix, build_number, self.suffix)
    }
}

/// Parse a branch name into its version parts.
///
/// Never fails: names outside the release grammar silently yield
/// [`VersionParts::fallback`].
///
/// # Examples
///
/// ```
/// use bvl_version::parse_branch;
///
/// let parts = parse_branch("v1.0-beta");
/// assert_eq!(parts.prefix, "v1.0");
/// assert_eq!(parts.numeric, "1.0");
/// assert_eq!(parts.suffix, "-beta");
///
/// assert!(parse_branch("main").is_fallback());
/// ```
pub fn parse_branch(branch: &str) -> VersionParts {
    split_release_branch(branch).unwrap_or_else(VersionParts::fallback)
}

/// Strip a leading `refs/heads/` from a Git ref name.
///
/// Names without the prefix are returned unchanged.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(HEADS_PREFIX).unwrap_or(git_ref)
}

fn split_release_branch(branch: &str) -> Option<VersionParts> {
    let rest = branch.strip_prefix('v')?;

    // The numeric part cannot contain '-', so the first one starts the suffix.
    let (numeric, suffix) = match rest.find('-') {
        Some(at) => rest.split_at(at),
        None => (rest, ""),
    };

    if !is_dotted_numeric(numeric) {
        return None;
    }
    if !suffix.is_empty() && !is_suffix(suffix) {
        return None;
    }

    Some(VersionParts {
        prefix: format!("v{numeric}"),
        numeric: numeric.to_string(),
        suffix: suffix.to_string(),
    })
}

fn is_dotted_numeric(s: &str) -> bool {
    !s.is_empty()
        && s
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn is_suffix(s: &str) -> bool {
    match s.strip_prefix('-') {
        Some(body) => {
            !body.is_empty()
                && body
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        }
        None => false,
    }
}
