use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use uplift_core::engine::{self, DeployOptions, Reporter};
use uplift_core::{AwsCli, clipboard, naming, snippet};
use uplift_retry::RetryConfig;
use uplift_types::{ArtifactKind, DeployReceipt, Target};

#[derive(Parser, Debug)]
#[command(name = "uplift", version)]
#[command(about = "Build, publish, and wire up CDN-hosted template bundles")]
struct Cli {
    /// Path to the deploy config record.
    #[arg(long, default_value = uplift_config::CONFIG_FILE)]
    config: PathBuf,

    /// Template project directory (holds dist/ and receives snapshots/).
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Publish the existing dist/ output without running builds.
    #[arg(long)]
    skip_build: bool,

    /// Skip local snapshots of the published files.
    #[arg(long)]
    skip_backup: bool,

    /// Max attempts per upload/invalidation.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff delay (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    base_delay: String,

    /// Max backoff delay (e.g. 1m).
    #[arg(long, default_value = "1m")]
    max_delay: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: build, backup, upload, invalidate,
    /// persist, and generate the loader snippet.
    Deploy {
        /// Explicit side-publish version. Skips CDN invalidation and
        /// config persistence; omit it to publish the live version.
        version: Option<String>,
    },
    /// Print the resolved publish units without side effects.
    Plan {
        version: Option<String>,
    },
    /// Regenerate the loader snippet only.
    Snippet {
        version: Option<String>,
    },
    /// Print environment diagnostics and the resolved target.
    Doctor,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = if cli.config.is_absolute() {
        cli.config.clone()
    } else {
        cli.project_dir.join(&cli.config)
    };

    let mut reporter = CliReporter;

    match &cli.cmd {
        Commands::Deploy { version } => {
            let retry = RetryConfig {
                max_attempts: cli.max_attempts,
                base_delay: parse_duration(&cli.base_delay)?,
                max_delay: parse_duration(&cli.max_delay)?,
            };
            let target = resolve_target(&config_path)?;
            let transport = AwsCli::new(target.clone(), retry);

            let opts = DeployOptions {
                project_dir: cli.project_dir.clone(),
                config_path,
                cli_version: version.clone(),
                skip_build: cli.skip_build,
                skip_backup: cli.skip_backup,
            };

            let receipt = engine::run_deploy(&opts, &target, &transport, &mut reporter)?;
            print_receipt(&receipt);

            if !receipt.all_ok() {
                bail!("{} stage(s) failed", receipt.failed_stages().len());
            }
        }
        Commands::Plan { version } => {
            print_plan(&cli, &config_path, version.as_deref())?;
        }
        Commands::Snippet { version } => {
            write_snippet_only(&cli, &config_path, version.as_deref(), &mut reporter)?;
        }
        Commands::Doctor => {
            run_doctor(&config_path, &mut reporter)?;
        }
    }

    Ok(())
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

/// Target defaults, overridable through optional keys in the config
/// record (`bucket`, `distributionId`, `cdnUrl`, `awsProfile`).
fn resolve_target(config_path: &PathBuf) -> Result<Target> {
    let record = uplift_config::load_raw(config_path)?;
    let mut target = Target::default();

    let overrides = [
        ("bucket", &mut target.bucket as &mut String),
        ("distributionId", &mut target.distribution_id),
        ("cdnUrl", &mut target.cdn_url),
        ("awsProfile", &mut target.aws_profile),
    ];
    for (key, slot) in overrides {
        if let Some(value) = record.get(key).and_then(|v| v.as_str()) {
            *slot = value.to_string();
        }
    }

    Ok(target)
}

fn enabled_kinds(config: &uplift_config::TemplateConfig) -> Vec<ArtifactKind> {
    let mut kinds = Vec::new();
    if config.has_misc() {
        kinds.push(ArtifactKind::Misc);
    }
    kinds.push(ArtifactKind::App);
    if config.has_wizard() {
        kinds.push(ArtifactKind::Wizard);
    }
    kinds
}

fn print_plan(cli: &Cli, config_path: &PathBuf, version: Option<&str>) -> Result<()> {
    let config = uplift_config::load_config(config_path)?;
    let branch = uplift_git::branch_label_or_unknown(&cli.project_dir);
    let ctx = naming::resolve_version(&config, version, branch, chrono_now())?;

    println!("template: {}", config.name);
    println!(
        "version: {} ({})",
        ctx.effective_version,
        if ctx.is_default_publish {
            "default publish"
        } else {
            "side publish"
        }
    );
    println!("branch: {}", ctx.source_branch);
    println!();

    for kind in enabled_kinds(&config) {
        for unit in naming::publish_units(&config, &ctx, kind, &cli.project_dir) {
            println!("{kind}: {} -> {}", unit.source.display(), unit.destination);
        }
    }

    Ok(())
}

fn write_snippet_only(
    cli: &Cli,
    config_path: &PathBuf,
    version: Option<&str>,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let config = uplift_config::load_config(config_path)?;
    let branch = uplift_git::branch_label_or_unknown(&cli.project_dir);
    let ctx = naming::resolve_version(&config, version, branch, chrono_now())?;
    let target = resolve_target(config_path)?;

    let params = snippet::SnippetParams::build(&config, &ctx, &target);
    let content = snippet::render(&params);
    let path = snippet::write_snippet(&cli.project_dir, &content)?;
    println!("wrote {}", path.display());

    if let Err(err) = clipboard::copy(&content) {
        reporter.warn(&format!("could not copy snippet to clipboard: {err:#}"));
    }

    Ok(())
}

fn run_doctor(config_path: &PathBuf, reporter: &mut dyn Reporter) -> Result<()> {
    match resolve_target(config_path) {
        Ok(target) => {
            println!("bucket: {}", target.bucket);
            println!("distribution: {}", target.distribution_id);
            println!("cdn: {}", target.cdn_url);
            println!("profile: {}", target.aws_profile);
        }
        Err(err) => reporter.warn(&format!("no readable deploy config: {err:#}")),
    }

    println!();
    for cmd in ["git", "yarn", "aws"] {
        print_cmd_version(cmd, reporter);
    }

    Ok(())
}

fn print_cmd_version(cmd: &str, reporter: &mut dyn Reporter) {
    match uplift_process::run_command(cmd, &["--version"]) {
        Ok(result) if result.success => {
            let line = result.stdout.lines().next().unwrap_or("").trim();
            println!("{cmd}: {line}");
        }
        Ok(result) => {
            reporter.warn(&format!(
                "{cmd} --version failed: {}",
                result.stderr.trim()
            ));
        }
        Err(err) => {
            reporter.warn(&format!("unable to run {cmd} --version: {err:#}"));
        }
    }
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

fn print_receipt(receipt: &DeployReceipt) {
    println!(
        "{}@{} ({})",
        receipt.template,
        receipt.version,
        if receipt.default_publish {
            "default publish"
        } else {
            "side publish"
        }
    );

    for outcome in &receipt.stages {
        let status = if outcome.ok { "ok" } else { "FAILED" };
        match &outcome.detail {
            Some(detail) => println!("  {}: {status} ({detail})", outcome.stage),
            None => println!("  {}: {status}", outcome.stage),
        }
    }

    if !receipt.changed_paths.is_empty() {
        println!();
        println!("changed paths:");
        for path in &receipt.changed_paths {
            println!("  {path}");
        }
    }
}
