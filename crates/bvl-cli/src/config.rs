//! Pipeline configuration file.
//!
//! ```toml
//! [ledger]
//! project_name = "api"
//! first_build_number = 1
//!
//! [store]
//! kind = "github"
//!
//! [github]
//! repository = "acme/app"
//! branch = "main"
//!
//! [image]
//! name = "api"
//! dockerhub_user = "acme"
//! owner = "Acme"
//! ```
//!
//! Every field is optional. Command-line flags and their env vars win over
//! the file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bvl_ledger::LedgerConfig;
use bvl_store::GithubStoreConfig;
use serde::Deserialize;

use crate::cli::StoreArgs;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Version files in a local directory, usually the checkout
    #[default]
    Fs,
    /// Version files in a GitHub repository, via the contents API
    Github,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub kind: StoreKind,
    pub root: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            kind: StoreKind::Fs,
            root: PathBuf::from("."),
        }
    }
}

/// Where built images are published.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageSection {
    pub name: Option<String>,
    pub dockerhub_user: Option<String>,
    /// GHCR namespace, usually the repository owner.
    pub owner: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ledger: LedgerConfig,
    pub store: StoreSection,
    pub github: GithubStoreConfig,
    pub image: ImageSection,
}

impl PipelineConfig {
    /// Load from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply a `--project` value; an empty one clears the project.
    pub fn apply_project(&mut self, project: Option<&str>) {
        if let Some(p) = project {
            self.ledger.project_name = Some(p).filter(|p| !p.is_empty()).map(str::to_string);
        }
    }

    /// Apply store flags over the file values.
    pub fn apply_store(&mut self, args: &StoreArgs) {
        if let Some(kind) = args.store {
            self.store.kind = kind;
        }
        if let Some(root) = &args.root {
            self.store.root = root.clone();
        }
        if let Some(repo) = &args.repo {
            self.github.repository = repo.clone();
        }
        if let Some(token) = &args.token {
            self.github.token = Some(token.clone());
        }
        if let Some(url) = &args.api_url {
            self.github.api_url = url.clone();
        }
        if let Some(branch) = &args.store_branch {
            self.github.branch = Some(branch.clone());
        }
    }
}
