use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use bvl_artifacts::{
    commit_message, compare_files, parse_tags_json, ArtifactLayout, ImageRef, ReleasePlan, SbomChange,
};
use bvl_ledger::{LedgerConfig, LedgerError, OutputFile, OutputSink, Outputs, VersionLedger, WriterSink};
use bvl_store::{BlobStore, FsBlobStore, GithubContentsStore};
use bvl_types::VersionRecord;
use colored::Colorize;
use tracing::{debug, info};

use crate::cli::*;
use crate::config::{PipelineConfig, StoreKind};

/// Exit status after losing a concurrent version update; reload and retry.
pub const EXIT_CONFLICT: u8 = 75;
/// Exit status asking the workflow to stop without failing.
pub const EXIT_NEUTRAL: u8 = 78;

/// How a successful command wants the process to end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Nothing to do downstream.
    Neutral,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Neutral => ExitCode::from(EXIT_NEUTRAL),
        }
    }
}

pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<LedgerError>() {
        Some(e) if e.is_conflict() => ExitCode::from(EXIT_CONFLICT),
        _ => ExitCode::FAILURE,
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<Status> {
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Advance(args) => cmd_advance(config, args, &format),
        Command::Show(args) => cmd_show(config, args, &format),
        Command::RegistryTags(args) => cmd_registry_tags(config, args, &format),
        Command::SbomDiff(args) => cmd_sbom_diff(config, args, &format),
        Command::ReleasePlan(args) => cmd_release_plan(config, args, &format),
        Command::Layout(args) => cmd_layout(config, args, &format),
    }
}

fn open_ledger(
    mut config: PipelineConfig,
    target: &TargetArgs,
    store: &StoreArgs,
) -> anyhow::Result<VersionLedger<Box<dyn BlobStore>>> {
    config.apply_project(target.project.as_deref());
    config.apply_store(store);

    let store: Box<dyn BlobStore> = match config.store.kind {
        StoreKind::Fs => {
            debug!(root = %config.store.root.display(), "using filesystem store");
            Box::new(FsBlobStore::new(config.store.root.clone()))
        }
        StoreKind::Github => {
            if config.github.repository.is_empty() {
                bail!("the github store needs --repo or GITHUB_REPOSITORY");
            }
            debug!(repository = %config.github.repository, "using github store");
            Box::new(GithubContentsStore::new(config.github.clone())?)
        }
    };
    Ok(VersionLedger::new(store, config.ledger))
}

/// Write outputs to the step output file, stdout, or both.
fn emit(outputs: &Outputs, output: Option<&Path>, format: &OutputFormat) -> anyhow::Result<()> {
    if let Some(path) = output {
        OutputFile::new(path)
            .emit(outputs)
            .with_context(|| format!("writing outputs to {}", path.display()))?;
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outputs.to_json())?),
        OutputFormat::Text if output.is_none() => WriterSink::new(io::stdout().lock()).emit(outputs)?,
        OutputFormat::Text => {}
    }
    Ok(())
}

fn cmd_advance(config: PipelineConfig, args: AdvanceArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    let ledger = open_ledger(config, &args.target, &args.store)?;
    let record = ledger.advance_branch(&args.target.branch)?;

    if matches!(format, OutputFormat::Text) {
        eprintln!(
            "{} {} is build {} of {}",
            "✓".green().bold(),
            record.version.yellow().bold(),
            record.build_number.to_string().bold(),
            record.branch.cyan()
        );
    }
    emit(&Outputs::for_record(&record), args.output.as_deref(), format)?;
    Ok(Status::Success)
}

fn cmd_show(config: PipelineConfig, args: ShowArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    let ledger = open_ledger(config, &args.target, &args.store)?;
    let loaded = ledger.load_branch(&args.target.branch)?;

    match (format, loaded) {
        (OutputFormat::Json, loaded) => {
            let record = loaded.map(|l| l.record);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        (OutputFormat::Text, Some(loaded)) => {
            print_record(&loaded.record);
            println!("  Token:   {}", loaded.token.short().dimmed());
        }
        (OutputFormat::Text, None) => {
            println!("No builds recorded for {}.", args.target.branch.yellow());
        }
    }
    Ok(Status::Success)
}

fn print_record(record: &VersionRecord) {
    println!("Branch {}", record.branch.yellow().bold());
    println!("  Build:   {}", record.build_number.to_string().bold());
    println!("  Version: {}", record.version.green());
    println!("  Tags:    {}", record.tags.join(", "));
}

/// An empty flag or env var counts as unset.
fn required(flag: Option<String>, file: Option<String>, name: &str) -> anyhow::Result<String> {
    let present = |v: &String| !v.is_empty();
    match flag.filter(present).or(file.filter(present)) {
        Some(value) => Ok(value),
        None => bail!("missing {name}: pass --{name} or set it under [image] in the config"),
    }
}

fn cmd_registry_tags(config: PipelineConfig, args: RegistryTagsArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    let tags = parse_tags_json(&args.tags)?;
    let image = config.image;
    let user = required(args.dockerhub_user, image.dockerhub_user, "dockerhub-user")?;
    let name = required(args.image, image.name, "image")?;
    let owner = required(args.owner, image.owner, "owner")?;
    let image = ImageRef::new(&user, &name, &owner);
    let refs = image.tags(&tags, &args.sha);
    info!(count = refs.all().len(), "generated image references");

    let outputs = refs
        .output_lines()
        .into_iter()
        .fold(Outputs::new(), |outputs, (name, value)| outputs.line(name, value));
    emit(&outputs, args.output.as_deref(), format)?;
    Ok(Status::Success)
}

fn cmd_sbom_diff(mut config: PipelineConfig, args: SbomDiffArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    config.apply_project(args.project.as_deref());
    let layout = ArtifactLayout::new(config.ledger.project_name.as_deref());
    let previous = args
        .previous
        .unwrap_or_else(|| layout.committed_sbom_txt(&args.root));
    let current = args
        .current
        .unwrap_or_else(|| layout.working_sbom_txt(&args.root));

    let change = compare_files(&previous, &current)?;
    if matches!(format, OutputFormat::Text) {
        match change {
            SbomChange::FirstSbom => eprintln!("{} First SBOM for this project.", "✓".green().bold()),
            SbomChange::Changed { added, removed } => eprintln!(
                "{} SBOM changed: {} added, {} removed",
                "✓".green().bold(),
                format!("+{added}").green(),
                format!("-{removed}").red()
            ),
            SbomChange::Unchanged => eprintln!("{} SBOM unchanged; nothing to publish.", "•".dimmed()),
        }
    }

    let outputs = Outputs::new().line("new_sbom", change.is_new().to_string());
    emit(&outputs, args.output.as_deref(), format)?;

    Ok(if change.is_new() { Status::Success } else { Status::Neutral })
}

fn cmd_release_plan(config: PipelineConfig, args: ReleasePlanArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    let ledger = open_ledger(config, &args.target, &args.store)?;
    let Some(loaded) = ledger.load_branch(&args.target.branch)? else {
        bail!("no version record for branch {}; run advance first", args.target.branch);
    };

    let plan = ReleasePlan::for_record(&loaded.record);
    let outputs = Outputs::new()
        .line("tag_name", &plan.tag_name)
        .line("release_name", &plan.name)
        .line("prerelease", plan.prerelease.to_string())
        .block("notes", plan.notes.trim_end());
    emit(&outputs, args.output.as_deref(), format)?;
    Ok(Status::Success)
}

fn cmd_layout(mut config: PipelineConfig, args: LayoutArgs, format: &OutputFormat) -> anyhow::Result<Status> {
    config.apply_project(args.target.project.as_deref());
    let layout = ArtifactLayout::new(config.ledger.project_name.as_deref());

    if args.copy_report && layout.copy_vulnerability_report(&args.root)? {
        info!(report = %layout.vulnerability_report_copy(), "copied vulnerability report");
    }
    let plan = layout.commit_plan(&args.root, &args.target.branch)?;
    let message = layout_commit_message(&config.ledger, &args.root, &args.target.branch)?;

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&plan)?;
            value["message"] = serde_json::json!(message);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            if let Some(message) = &message {
                println!("  {} {message}", "message:".cyan());
            }
            for file in &plan.files {
                println!("  {} {} -> {}", "commit:".green(), file.local.display(), file.repo_path);
            }
            for path in &plan.skipped {
                println!("  {} {}", "missing:".yellow(), path.display());
            }
            if plan.is_empty() {
                println!("Nothing to commit.");
            }
        }
    }
    Ok(Status::Success)
}

/// Commit message for the version file checked out under `root`, if any.
fn layout_commit_message(ledger: &LedgerConfig, root: &Path, branch: &str) -> anyhow::Result<Option<String>> {
    let ledger = VersionLedger::new(FsBlobStore::new(root), ledger.clone());
    Ok(ledger
        .load_branch(branch)?
        .map(|loaded| commit_message(&loaded.record.version)))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn run(args: &[&str]) -> anyhow::Result<Status> {
        run_command(Cli::try_parse_from(args).unwrap())
    }

    fn outputs_of(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn advance_writes_outputs_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let out = dir.path().join("github_output");
        let out_arg = out.to_str().unwrap();

        for _ in 0..2 {
            let status = run(&[
                "bvl", "advance", "--branch", "refs/heads/v1.0-beta", "--project", "",
                "--store", "fs", "--root", root, "--output", out_arg,
            ])
            .unwrap();
            assert_eq!(status, Status::Success);
        }

        let text = outputs_of(&out);
        assert!(text.contains("full_version=v1.0.1-beta\n"));
        assert!(text.contains(
            "full_version=v1.0.2-beta\ntags<<EOF\n[\"v1-beta\",\"v1.0-beta\",\"v1.0.2-beta\",\"beta\"]\nEOF\n"
        ));
        assert!(dir.path().join(".version_v1.0-beta.json").is_file());
    }

    #[test]
    fn advance_uses_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bvl.toml");
        std::fs::write(
            &config,
            format!(
                "[ledger]\nproject_name = \"api\"\nfirst_build_number = 0\n\n[store]\nroot = {:?}\n",
                dir.path().to_str().unwrap()
            ),
        )
        .unwrap();
        let out = dir.path().join("out");

        let args = AdvanceArgs {
            target: TargetArgs { branch: "v3.2".into(), project: None },
            store: StoreArgs { store: Some(StoreKind::Fs), ..Default::default() },
            output: Some(out.clone()),
        };
        cmd_advance(PipelineConfig::load(Some(config.as_path())).unwrap(), args, &OutputFormat::Text).unwrap();

        assert!(dir.path().join(".version_api_v3.2.json").is_file());
        assert!(outputs_of(&out).contains("full_version=v3.2.0\n"));
    }

    #[test]
    fn conflict_maps_to_retry_status() {
        let err: anyhow::Error = LedgerError::WriteConflict {
            key: ".version_v1.json".into(),
            source: bvl_store::StoreError::Conflict {
                key: ".version_v1.json".into(),
                expected: None,
                actual: None,
            },
        }
        .into();
        assert_eq!(exit_code_for(&err), ExitCode::from(EXIT_CONFLICT));
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), ExitCode::FAILURE);
    }

    #[test]
    fn github_store_requires_repository() {
        let err = open_ledger(
            PipelineConfig::default(),
            &TargetArgs { branch: "v1".into(), project: None },
            &StoreArgs { store: Some(StoreKind::Github), ..Default::default() },
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("--repo"));
    }

    #[test]
    fn registry_tags_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        run(&[
            "bvl", "registry-tags", "--tags", "[\"v1\",\"latest\"]", "--dockerhub-user", "jane",
            "--image", "api", "--owner", "Acme", "--sha", "abc123", "--output", out.to_str().unwrap(),
        ])
        .unwrap();

        let text = outputs_of(&out);
        assert!(text.contains("dockerhub_tags=jane/api:v1,jane/api:latest\n"));
        assert!(text.contains("ghcr_sha_tag=ghcr.io/acme/api:abc123\n"));
    }

    #[test]
    fn registry_tags_fall_back_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bvl.toml");
        std::fs::write(&config, "[image]\nname = \"api\"\ndockerhub_user = \"jane\"\nowner = \"Acme\"\n").unwrap();
        let out = dir.path().join("out");
        let args = RegistryTagsArgs {
            tags: "[\"v1\"]".into(),
            dockerhub_user: Some(String::new()),
            image: Some("web".into()),
            owner: None,
            sha: "abc123".into(),
            output: Some(out.clone()),
        };
        cmd_registry_tags(PipelineConfig::load(Some(config.as_path())).unwrap(), args, &OutputFormat::Text).unwrap();

        let text = outputs_of(&out);
        assert!(text.contains("dockerhub_tags=jane/web:v1\n"));
        assert!(text.contains("ghcr_tags=ghcr.io/acme/web:v1\n"));
    }

    #[test]
    fn empty_flag_falls_back_to_file_value() {
        assert_eq!(required(Some(String::new()), Some("jane".into()), "dockerhub-user").unwrap(), "jane");
        assert_eq!(required(Some("kim".into()), Some("jane".into()), "dockerhub-user").unwrap(), "kim");
        let err = required(Some(String::new()), Some(String::new()), "owner").unwrap_err();
        assert!(err.to_string().contains("missing owner"));
        assert!(required(None, None, "image").is_err());
    }

    #[test]
    fn layout_message_follows_checked_out_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::for_project("api");
        assert_eq!(layout_commit_message(&config, dir.path(), "v1.0-beta").unwrap(), None);

        VersionLedger::new(FsBlobStore::new(dir.path()), config.clone())
            .advance_branch("v1.0-beta")
            .unwrap();
        assert_eq!(
            layout_commit_message(&config, dir.path(), "v1.0-beta").unwrap().as_deref(),
            Some("Update version files for v1.0.1-beta")
        );

        let args = LayoutArgs {
            target: TargetArgs { branch: "v1.0-beta".into(), project: Some("api".into()) },
            root: dir.path().to_path_buf(),
            copy_report: false,
        };
        assert_eq!(cmd_layout(PipelineConfig::default(), args, &OutputFormat::Json).unwrap(), Status::Success);
    }

    #[test]
    fn unchanged_sbom_is_neutral() {
        let dir = tempfile::tempdir().unwrap();
        for sub in [".sbom", ".sbom_"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("sbom.txt"), "zlib 1.3\n").unwrap();
        }
        let out = dir.path().join("out");
        let status = run(&[
            "bvl", "sbom-diff", "--project", "", "--root", dir.path().to_str().unwrap(),
            "--output", out.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(status, Status::Neutral);
        assert_eq!(outputs_of(&out), "new_sbom=false\n");

        std::fs::write(dir.path().join(".sbom_/sbom.txt"), "zlib 1.3.1\n").unwrap();
        let status = run(&[
            "bvl", "sbom-diff", "--project", "", "--root", dir.path().to_str().unwrap(),
            "--output", out.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(status, Status::Success);
        assert!(outputs_of(&out).ends_with("new_sbom=true\n"));
    }

    #[test]
    fn release_plan_needs_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let out = dir.path().join("out");
        let out_arg = out.to_str().unwrap();
        let base = ["--branch", "v1.0-beta", "--project", "", "--store", "fs", "--root", root, "--output", out_arg];

        let mut args = vec!["bvl", "release-plan"];
        args.extend(base);
        assert!(run(&args).is_err());

        let mut advance = vec!["bvl", "advance"];
        advance.extend(base);
        run(&advance).unwrap();
        run(&args).unwrap();

        let text = outputs_of(&out);
        assert!(text.contains("tag_name=v1.0.1-beta\n"));
        assert!(text.contains("release_name=Release v1.0.1-beta\n"));
        assert!(text.contains("prerelease=true\n"));
        assert!(text.contains("notes<<EOF\nVersion v1.0.1-beta\nBuild Number: 1\n"));
    }
}
