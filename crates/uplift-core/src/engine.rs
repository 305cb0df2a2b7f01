//! The pipeline orchestrator.
//!
//! One run is a fixed sequence: build/backup/publish for each enabled
//! artifact kind (misc, primary, wizard, in that order), then CDN
//! invalidation of the accumulated changed set, version write-back, and
//! snippet generation. Stages fail independently; the receipt records
//! each outcome and callers decide the exit code from it.
//!
//! Ordering constraints that do hold: invalidation sees the union of
//! all publish outputs, persistence happens strictly after publishing,
//! and the snippet is the terminal stage.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use uplift_config::TemplateConfig;
use uplift_types::{ArtifactKind, DeployReceipt, Stage, StageOutcome, Target, VersionContext};

use crate::publish::Transport;
use crate::{backup, clipboard, naming, publish, snippet};

/// Destination for pipeline diagnostics. The CLI prints to stderr;
/// tests collect.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Package-script runner used for builds.
const BUILD_RUNNER: &str = "yarn";

/// Per-run inputs for the pipeline.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Directory holding `dist/`, `snapshots/`, and the snippet output.
    pub project_dir: PathBuf,
    /// Path to `deploy.config.js`.
    pub config_path: PathBuf,
    /// Explicit side-publish version; `None` means default publish.
    pub cli_version: Option<String>,
    /// Skip the external build commands (publish existing `dist/` output).
    pub skip_build: bool,
    /// Skip local snapshots.
    pub skip_backup: bool,
}

/// Run the whole deployment pipeline.
///
/// Fatal errors are an unreadable config and a missing template name;
/// everything else is recorded in the receipt and the run continues.
pub fn run_deploy(
    opts: &DeployOptions,
    target: &Target,
    transport: &dyn Transport,
    reporter: &mut dyn Reporter,
) -> Result<DeployReceipt> {
    let config = uplift_config::load_config(&opts.config_path)?;

    let branch = match uplift_git::branch_label(&opts.project_dir) {
        Ok(branch) => branch,
        Err(err) => {
            reporter.warn(&format!(
                "could not determine git branch ({err:#}); using \"{}\"",
                uplift_git::UNKNOWN_BRANCH
            ));
            uplift_git::UNKNOWN_BRANCH.to_string()
        }
    };

    let started_at = Utc::now();
    let ctx = naming::resolve_version(&config, opts.cli_version.as_deref(), branch, started_at)?;

    reporter.info(&format!(
        "deploying {}@{} ({})",
        config.name,
        ctx.effective_version,
        if ctx.is_default_publish {
            "default publish"
        } else {
            "side publish"
        }
    ));

    let mut stages: Vec<StageOutcome> = Vec::new();
    let mut changed: Vec<String> = Vec::new();

    if config.has_misc() {
        changed.extend(deploy_kind(
            ArtifactKind::Misc,
            &config,
            &ctx,
            opts,
            transport,
            reporter,
            &mut stages,
        ));
    }

    changed.extend(deploy_kind(
        ArtifactKind::App,
        &config,
        &ctx,
        opts,
        transport,
        reporter,
        &mut stages,
    ));

    if config.has_wizard() {
        changed.extend(deploy_kind(
            ArtifactKind::Wizard,
            &config,
            &ctx,
            opts,
            transport,
            reporter,
            &mut stages,
        ));
    }

    let invalidated = invalidate_stage(&ctx, &changed, transport, reporter, &mut stages);
    let persisted = persist_stage(&ctx, opts, reporter, &mut stages);
    snippet_stage(&config, &ctx, target, opts, reporter, &mut stages);

    Ok(DeployReceipt {
        template: config.name.clone(),
        version: ctx.effective_version.clone(),
        default_publish: ctx.is_default_publish,
        started_at,
        finished_at: Utc::now(),
        stages,
        changed_paths: changed,
        invalidated,
        persisted,
    })
}

/// Build, backup, and publish one artifact kind. Returns its changed set.
fn deploy_kind(
    kind: ArtifactKind,
    config: &TemplateConfig,
    ctx: &VersionContext,
    opts: &DeployOptions,
    transport: &dyn Transport,
    reporter: &mut dyn Reporter,
    stages: &mut Vec<StageOutcome>,
) -> Vec<String> {
    if !opts.skip_build {
        stages.push(build_stage(kind, opts, reporter));
    }

    let units = naming::publish_units(config, ctx, kind, &opts.project_dir);

    if !opts.skip_backup {
        let archived = backup::archive_units(&opts.project_dir, &ctx.source_branch, &units, reporter);
        // Backups never escalate; partial archives are recorded but do
        // not fail the run.
        stages.push(StageOutcome::ok_with(
            Stage::Backup { kind },
            format!("archived {archived} of {} file(s)", units.len()),
        ));
    }

    let kind_changed = publish::publish_set(kind, &units, transport, reporter);
    stages.push(if kind_changed.is_empty() {
        StageOutcome::failed(Stage::Publish { kind }, "changed set dropped after failure")
    } else {
        StageOutcome::ok_with(Stage::Publish { kind }, format!("{} file(s)", kind_changed.len()))
    });

    kind_changed
}

/// Run the external build command for one kind. A failed build is a
/// failed stage, but siblings still attempt to run.
fn build_stage(kind: ArtifactKind, opts: &DeployOptions, reporter: &mut dyn Reporter) -> StageOutcome {
    let script = kind.build_script();
    reporter.info(&format!("running `{BUILD_RUNNER} run {script}`..."));

    match uplift_process::run_streaming_in_dir(BUILD_RUNNER, &["run", script], &opts.project_dir) {
        Ok(result) if result.success => StageOutcome::ok(Stage::Build { kind }),
        Ok(result) => {
            reporter.error(&format!(
                "{kind}: build failed with exit code {:?}",
                result.exit_code
            ));
            StageOutcome::failed(
                Stage::Build { kind },
                format!("exit code {:?}", result.exit_code),
            )
        }
        Err(err) => {
            reporter.error(&format!("{kind}: could not run build: {err:#}"));
            StageOutcome::failed(Stage::Build { kind }, format!("{err:#}"))
        }
    }
}

fn invalidate_stage(
    ctx: &VersionContext,
    changed: &[String],
    transport: &dyn Transport,
    reporter: &mut dyn Reporter,
    stages: &mut Vec<StageOutcome>,
) -> bool {
    if !ctx.is_default_publish {
        reporter.info("side publish: skipping CDN invalidation");
        return false;
    }
    if changed.is_empty() {
        reporter.info("nothing published: skipping CDN invalidation");
        return false;
    }

    match transport.invalidate(changed) {
        Ok(()) => {
            stages.push(StageOutcome::ok_with(
                Stage::Invalidate,
                format!("{} path(s)", changed.len()),
            ));
            true
        }
        Err(err) => {
            // Stale cache entries are a degraded state, not an abort.
            reporter.error(&format!("CDN invalidation failed: {err:#}"));
            stages.push(StageOutcome::failed(Stage::Invalidate, format!("{err:#}")));
            false
        }
    }
}

fn persist_stage(
    ctx: &VersionContext,
    opts: &DeployOptions,
    reporter: &mut dyn Reporter,
    stages: &mut Vec<StageOutcome>,
) -> bool {
    if !ctx.is_default_publish {
        reporter.info("side publish: leaving deploy config untouched");
        return false;
    }

    match uplift_config::persist_versions(&opts.config_path, &ctx.effective_version) {
        Ok(()) => {
            stages.push(StageOutcome::ok(Stage::Persist));
            true
        }
        Err(err) => {
            reporter.error(&format!("failed to persist deploy config: {err:#}"));
            stages.push(StageOutcome::failed(Stage::Persist, format!("{err:#}")));
            false
        }
    }
}

fn snippet_stage(
    config: &TemplateConfig,
    ctx: &VersionContext,
    target: &Target,
    opts: &DeployOptions,
    reporter: &mut dyn Reporter,
    stages: &mut Vec<StageOutcome>,
) {
    let params = snippet::SnippetParams::build(config, ctx, target);
    let content = snippet::render(&params);

    match snippet::write_snippet(&opts.project_dir, &content) {
        Ok(path) => {
            reporter.info(&format!("wrote loader snippet to {}", path.display()));
            if let Err(err) = clipboard::copy(&content) {
                reporter.warn(&format!("could not copy snippet to clipboard: {err:#}"));
            }
            stages.push(StageOutcome::ok(Stage::Snippet));
        }
        Err(err) => {
            reporter.error(&format!("snippet generation failed: {err:#}"));
            stages.push(StageOutcome::failed(Stage::Snippet, format!("{err:#}")));
        }
    }
}
