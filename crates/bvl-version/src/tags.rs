use serde::Serialize;

/// Channel tag used when a branch carries no suffix.
pub const LATEST: &str = "latest";

/// The ordered tag list of one build.
///
/// Layout for numeric version `1.2.3`, suffix `-rc` and build `7`:
///
/// ```text
/// [ v1-rc, v1.2-rc, v1.2.3-rc,   v1.2.3.7-rc,   rc ]
///   ^ one per version prefix     ^ full version ^ channel
/// ```
///
/// Consumers index from the end: `tags[len-2]` is always the full version
/// and `tags[len-1]` is always the channel. A `TagSet` is only built by
/// [`generate_tags`], so both indices always exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// The full version tag, e.g. `v1.0.5-beta`.
    pub fn full_version(&self) -> &str {
        &self.0[self.0.len() - 2]
    }

    /// The trailing channel tag: the suffix without leading `-`, or `latest`.
    pub fn channel(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Generate the tag list for a build.
///
/// `numeric_version` is the dotted integer part of the branch (`1.2`),
/// `suffix` is empty or starts with `-`.
///
/// # Examples
///
/// ```
/// use bvl_version::generate_tags;
///
/// let tags = generate_tags("1.0", "-beta", 5);
/// assert_eq!(tags.as_slice(), ["v1-beta", "v1.0-beta", "v1.0.5-beta", "beta"]);
/// assert_eq!(tags.full_version(), "v1.0.5-beta");
/// ```
pub fn generate_tags(numeric_version: &str, suffix: &str, build_number: u64) -> TagSet {
    let mut tags = Vec::new();

    let mut current = String::from("v");
    for (i, part) in numeric_version.split('.').enumerate() {
        if i > 0 {
            current.push('.');
        }
        current.push_str(part);
        tags.push(format!("{current}{suffix}"));
    }

    tags.push(format!("v{numeric_version}.{build_number}{suffix}"));

    let channel = if suffix.is_empty() {
        LATEST.to_string()
    } else {
        suffix.trim_start_matches('-').to_string()
    };
    tags.push(channel);

    TagSet(tags)
}
