use std::path::PathBuf;

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};

use crate::config::StoreKind;

#[derive(Parser)]
#[command(
    name = "bvl",
    about = "Build Version Ledger: monotonic build numbers and image tags for release branches",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML pipeline configuration; flags and env vars override it
    #[arg(long, global = true, env = "BVL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Increment the build number of a branch and emit its version and tags
    Advance(AdvanceArgs),
    /// Show the current version record of a branch
    Show(ShowArgs),
    /// Expand version tags into Docker Hub and GHCR image references
    RegistryTags(RegistryTagsArgs),
    /// Check whether the generated SBOM differs from the committed one
    SbomDiff(SbomDiffArgs),
    /// Derive the release tag, title and notes for a branch's current version
    ReleasePlan(ReleasePlanArgs),
    /// List the artifact files a build commits back to the repository
    Layout(LayoutArgs),
}

/// The branch being built and the project it belongs to.
#[derive(Args)]
pub struct TargetArgs {
    /// Branch name or full ref; `refs/heads/` is stripped
    #[arg(long, env = "GITHUB_REF", value_parser = parse_branch_ref)]
    pub branch: String,

    #[arg(long, env = "PROJECT_NAME")]
    pub project: Option<String>,
}

/// Where version records are kept.
#[derive(Args, Default)]
pub struct StoreArgs {
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Root directory of the filesystem store
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// `owner/name` of the repository holding the version files
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long)]
    pub api_url: Option<String>,

    /// Repository branch the version files are committed to
    #[arg(long)]
    pub store_branch: Option<String>,
}

#[derive(Args)]
pub struct AdvanceArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub store: StoreArgs,
    /// Step output file; stdout when unset
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct RegistryTagsArgs {
    /// JSON array of tags, as emitted by `advance`
    #[arg(long, env = "TAGS_JSON")]
    pub tags: String,
    #[arg(long, env = "DOCKER_USERNAME")]
    pub dockerhub_user: Option<String>,
    #[arg(long, env = "IMAGE_NAME")]
    pub image: Option<String>,
    /// GHCR namespace; lowercased
    #[arg(long, env = "REPO_OWNER")]
    pub owner: Option<String>,
    #[arg(long, env = "GITHUB_SHA", value_parser = NonEmptyStringValueParser::new())]
    pub sha: String,
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct SbomDiffArgs {
    #[arg(long, env = "PROJECT_NAME")]
    pub project: Option<String>,
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Committed SBOM text; defaults to the project's committed SBOM dir
    #[arg(long)]
    pub previous: Option<PathBuf>,
    /// Generated SBOM text; defaults to the project's working SBOM dir
    #[arg(long)]
    pub current: Option<PathBuf>,
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReleasePlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub store: StoreArgs,
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Copy the vulnerability report to its release name first
    #[arg(long)]
    pub copy_report: bool,
}

fn parse_branch_ref(value: &str) -> Result<String, String> {
    let branch = bvl_version::branch_from_ref(value.trim());
    if branch.is_empty() {
        return Err("branch must not be empty".into());
    }
    Ok(branch.to_string())
}
