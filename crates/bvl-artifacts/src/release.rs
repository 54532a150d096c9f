use serde::Serialize;

use bvl_types::VersionRecord;

/// Channels published as pre-releases.
const PRERELEASE_CHANNELS: [&str; 2] = ["alpha", "beta"];

/// What to publish as the release of a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub tag_name: String,
    pub name: String,
    pub prerelease: bool,
    pub notes: String,
}

impl ReleasePlan {
    pub fn for_record(record: &VersionRecord) -> Self {
        let prerelease = channel_suffix(&record.version).is_some_and(|s| {
            PRERELEASE_CHANNELS
                .iter()
                .any(|c| s.eq_ignore_ascii_case(c))
        });
        let release_type = if prerelease {
            "Pre-release"
        } else {
            "Regular Release"
        };

        let mut notes = format!(
            "Version {}\nBuild Number: {}\nBranch: {}\nRelease Type: {release_type}\nDocker Tags:\n",
            record.version, record.build_number, record.branch
        );
        for tag in &record.tags {
            notes.push_str("- ");
            notes.push_str(tag);
            notes.push('\n');
        }

        Self {
            tag_name: record.version.clone(),
            name: format!("Release {}", record.version),
            prerelease,
            notes,
        }
    }
}

/// The segment after the first `-` of a version, up to the next `-`.
///
/// `v1.0.5-beta` gives `beta`; `v1.0.5` gives `None`.
pub fn channel_suffix(version: &str) -> Option<&str> {
    version.split('-').nth(1)
}
