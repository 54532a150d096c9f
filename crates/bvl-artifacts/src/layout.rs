//! File naming for generated artifacts.
//!
//! Every artifact name is derived from an optional project name, so several
//! projects can share one repository without overwriting each other:
//!
//! | artifact              | no project                  | project `api`                   |
//! |-----------------------|-----------------------------|---------------------------------|
//! | SBOM working dir      | `.sbom_`                    | `.sbom_api_`                    |
//! | SBOM committed dir    | `.sbom`                     | `.sbom_api`                     |
//! | vulnerability report  | `.vulnerability_report.txt` | `.vulnerability_report_api.txt` |
//! | release copy          | `vulnerability_report.txt`  | `vulnerability_report_api.txt`  |
//! | version file          | `.version_<branch>.json`    | `.version_api_<branch>.json`    |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bvl_types::LedgerKey;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ArtifactError, ArtifactResult};

pub const SBOM_JSON: &str = "sbom.json";
pub const SBOM_TXT: &str = "sbom.txt";

/// Artifact names for one project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtifactLayout {
    project: Option<String>,
}

impl ArtifactLayout {
    /// An empty project name is the same as none.
    pub fn new(project: Option<&str>) -> Self {
        Self {
            project: project.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn suffixed(&self, base: &str) -> String {
        match &self.project {
            Some(p) => format!("{base}_{p}"),
            None => base.to_string(),
        }
    }

    /// Directory the SBOM generator writes into.
    pub fn sbom_working_dir(&self) -> String {
        format!("{}_", self.suffixed(".sbom"))
    }

    /// Directory the SBOM is committed to.
    pub fn sbom_committed_dir(&self) -> String {
        self.suffixed(".sbom")
    }

    pub fn vulnerability_report(&self) -> String {
        format!("{}.txt", self.suffixed(".vulnerability_report"))
    }

    /// Name of the report copy attached to releases; dotfiles are easy to miss.
    pub fn vulnerability_report_copy(&self) -> String {
        format!("{}.txt", self.suffixed("vulnerability_report"))
    }

    pub fn version_key(&self, branch: &str) -> ArtifactResult<LedgerKey> {
        Ok(LedgerKey::new(self.project(), branch)?)
    }

    /// The working-tree SBOM text file, i.e. the one just generated.
    pub fn working_sbom_txt(&self, root: &Path) -> PathBuf {
        root.join(self.sbom_working_dir()).join(SBOM_TXT)
    }

    /// The committed SBOM text file from the previous build.
    pub fn committed_sbom_txt(&self, root: &Path) -> PathBuf {
        root.join(self.sbom_committed_dir()).join(SBOM_TXT)
    }

    /// Copy the vulnerability report to its release name.
    ///
    /// Returns `false` without error when there is no report.
    pub fn copy_vulnerability_report(&self, root: &Path) -> ArtifactResult<bool> {
        let from = root.join(self.vulnerability_report());
        let to = root.join(self.vulnerability_report_copy());
        match fs::copy(&from, &to) {
            Ok(_) => {
                debug!(from = %from.display(), to = %to.display(), "copied vulnerability report");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && !from.exists() => Ok(false),
            Err(e) => Err(ArtifactError::io(to, e)),
        }
    }

    /// Files to commit after a build of `branch`, checked against `root`.
    ///
    /// Order is fixed: SBOM JSON, SBOM text, vulnerability report, version
    /// file. Files missing from disk are skipped.
    pub fn commit_plan(&self, root: &Path, branch: &str) -> ArtifactResult<CommitPlan> {
        let working = self.sbom_working_dir();
        let committed = self.sbom_committed_dir();
        let report = self.vulnerability_report();
        let version = self.version_key(branch)?.path();

        let candidates = [
            (format!("{working}/{SBOM_JSON}"), format!("{committed}/{SBOM_JSON}")),
            (format!("{working}/{SBOM_TXT}"), format!("{committed}/{SBOM_TXT}")),
            (report.clone(), report),
            (version.clone(), version),
        ];

        let mut plan = CommitPlan::default();
        for (local, repo_path) in candidates {
            let local = root.join(local);
            if local.is_file() {
                plan.files.push(CommitFile { local, repo_path });
            } else {
                warn!(path = %local.display(), "file not found; not committing it");
                plan.skipped.push(local);
            }
        }
        Ok(plan)
    }
}

/// One file to commit: where it is now and where it goes in the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitFile {
    pub local: PathBuf,
    pub repo_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommitPlan {
    pub files: Vec<CommitFile>,
    pub skipped: Vec<PathBuf>,
}

impl CommitPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Commit message for the files of a build.
pub fn commit_message(version: &str) -> String {
    format!("Update version files for {version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn names_without_project() {
        let layout = ArtifactLayout::new(None);
        assert_eq!(layout.sbom_working_dir(), ".sbom_");
        assert_eq!(layout.sbom_committed_dir(), ".sbom");
        assert_eq!(layout.vulnerability_report(), ".vulnerability_report.txt");
        assert_eq!(layout.vulnerability_report_copy(), "vulnerability_report.txt");
        assert_eq!(layout.version_key("v1.2").unwrap().path(), ".version_v1.2.json");
    }

    #[test]
    fn names_with_project() {
        let layout = ArtifactLayout::new(Some("api"));
        assert_eq!(layout.sbom_working_dir(), ".sbom_api_");
        assert_eq!(layout.sbom_committed_dir(), ".sbom_api");
        assert_eq!(layout.vulnerability_report(), ".vulnerability_report_api.txt");
        assert_eq!(layout.vulnerability_report_copy(), "vulnerability_report_api.txt");
        assert_eq!(
            layout.version_key("v1.2").unwrap().path(),
            ".version_api_v1.2.json"
        );
    }

    #[test]
    fn empty_project_is_none() {
        assert_eq!(ArtifactLayout::new(Some("")), ArtifactLayout::new(None));
    }

    #[test]
    fn commit_plan_keeps_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, ".version_v2.json");
        touch(root, ".sbom_/sbom.txt");
        touch(root, ".sbom_/sbom.json");

        let plan = ArtifactLayout::new(None).commit_plan(root, "v2").unwrap();
        let repo_paths: Vec<_> = plan.files.iter().map(|f| f.repo_path.as_str()).collect();
        assert_eq!(
            repo_paths,
            [".sbom/sbom.json", ".sbom/sbom.txt", ".version_v2.json"]
        );
        assert_eq!(plan.files[0].local, root.join(".sbom_/sbom.json"));
        assert_eq!(plan.skipped, vec![root.join(".vulnerability_report.txt")]);
    }

    #[test]
    fn commit_plan_with_nothing_on_disk_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ArtifactLayout::new(Some("web"))
            .commit_plan(dir.path(), "v1")
            .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.skipped.len(), 4);
    }

    #[test]
    fn commit_plan_rejects_empty_branch() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactLayout::new(None).commit_plan(dir.path(), "").unwrap_err();
        assert!(matches!(err, ArtifactError::Type(_)));
    }

    #[test]
    fn copies_vulnerability_report() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(Some("api"));
        assert!(!layout.copy_vulnerability_report(dir.path()).unwrap());

        touch(dir.path(), ".vulnerability_report_api.txt");
        assert!(layout.copy_vulnerability_report(dir.path()).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("vulnerability_report_api.txt")).unwrap(),
            ".vulnerability_report_api.txt"
        );
    }

    #[test]
    fn sbom_paths() {
        let layout = ArtifactLayout::new(None);
        let root = Path::new("/w");
        assert_eq!(layout.working_sbom_txt(root), Path::new("/w/.sbom_/sbom.txt"));
        assert_eq!(layout.committed_sbom_txt(root), Path::new("/w/.sbom/sbom.txt"));
    }

    #[test]
    fn message() {
        assert_eq!(commit_message("v1.0.5-beta"), "Update version files for v1.0.5-beta");
    }
}
