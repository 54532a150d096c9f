//! Storage key derivation.
//!
//! Every consumer of the ledger addresses a version record through
//! [`LedgerKey`]; nothing else builds version file names by hand.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The storage key of one version record.
///
/// Layout:
///
/// - `.version_{project}_{branch}.json` when a project name is set
/// - `.version_{branch}.json` otherwise
///
/// The branch is used verbatim, so `feature/login` addresses the nested path
/// `.version_feature/login.json`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    project: Option<String>,
    branch: String,
}

impl LedgerKey {
    /// Build the key for `branch`, optionally scoped to `project`.
    ///
    /// An empty project name is treated as no project.
    pub fn new(project: Option<&str>, branch: &str) -> Result<Self, TypeError> {
        if branch.is_empty() {
            return Err(TypeError::EmptyBranch);
        }
        Ok(Self {
            project: project.filter(|p| !p.is_empty()).map(str::to_owned),
            branch: branch.to_owned(),
        })
    }

    /// The project name, if any.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// The branch this key addresses.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The store path for this key.
    pub fn path(&self) -> String {
        match &self.project {
            Some(project) => format!(".version_{project}_{}.json", self.branch),
            None => format!(".version_{}.json", self.branch),
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
