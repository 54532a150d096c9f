use serde::{Deserialize, Serialize};

use bvl_types::LedgerKey;

use crate::error::LedgerResult;

/// Configuration for a [`VersionLedger`](crate::VersionLedger).
///
/// The ledger reads nothing from the process environment; whatever the
/// caller resolved from flags, env vars or config files arrives here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Scopes version files per project when several images share a repo.
    pub project_name: Option<String>,
    /// Build number assigned when a key has no prior record.
    pub first_build_number: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            first_build_number: 1,
        }
    }
}

impl LedgerConfig {
    /// A configuration scoped to `project`.
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project_name: Some(project.into()),
            ..Default::default()
        }
    }

    /// The storage key of `branch` under this configuration.
    pub fn key_for(&self, branch: &str) -> LedgerResult<LedgerKey> {
        Ok(LedgerKey::new(self.project_name.as_deref(), branch)?)
    }
}
