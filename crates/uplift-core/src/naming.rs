//! Version resolution and destination/backup naming.
//!
//! All addressing is deterministic: destination paths are
//! `/scripts/{name}{-suffix}/{version}.{ext}` and backup filenames are
//! `{timestamp}-{name}{-suffix}-{version}.{ext}`, with the extension
//! derived from the content type alone, never from the source filename.

use std::path::Path;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use uplift_config::TemplateConfig;
use uplift_types::{ArtifactKind, CSS_CONTENT_TYPE, JS_CONTENT_TYPE, PublishUnit, VersionContext};

/// Backup generation stamp format, shared by all units of one run.
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Resolve the effective version for this run.
///
/// An explicit CLI version marks a side/preview publish: cache
/// invalidation and config persistence are skipped downstream.
pub fn resolve_version(
    config: &TemplateConfig,
    cli_version: Option<&str>,
    source_branch: String,
    now: DateTime<Utc>,
) -> Result<VersionContext> {
    if config.name.trim().is_empty() {
        bail!("deploy config is missing the required `name` field");
    }

    let effective_version = cli_version
        .map(str::to_string)
        .or_else(|| config.app_version.clone())
        .unwrap_or_default();

    Ok(VersionContext {
        effective_version,
        source_branch,
        timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
        is_default_publish: cli_version.is_none(),
    })
}

/// File extension for a content type: `application/javascript` -> `js`,
/// otherwise the subtype after `/`.
pub fn extension_for(content_type: &str) -> &str {
    if content_type == JS_CONTENT_TYPE {
        "js"
    } else {
        content_type.split('/').nth(1).unwrap_or(content_type)
    }
}

fn adjusted_suffix(suffix: &str) -> String {
    if suffix.is_empty() {
        String::new()
    } else {
        format!("-{suffix}")
    }
}

/// Bucket key for one published file.
pub fn destination(name: &str, suffix: &str, version: &str, content_type: &str) -> String {
    format!(
        "/scripts/{name}{}/{version}.{}",
        adjusted_suffix(suffix),
        extension_for(content_type)
    )
}

/// Archive filename for one published file.
pub fn backup_name(
    timestamp: &str,
    name: &str,
    suffix: &str,
    version: &str,
    content_type: &str,
) -> String {
    format!(
        "{timestamp}-{name}{}-{version}.{}",
        adjusted_suffix(suffix),
        extension_for(content_type)
    )
}

/// The files one artifact kind publishes, fully resolved.
///
/// The primary kind honors `scriptVersion == "vite"` (single-file
/// bundle under `dist/{name}.es.js`) and the `css` flag; wizard always
/// ships script + stylesheet; misc ships the script alone.
pub fn publish_units(
    config: &TemplateConfig,
    ctx: &VersionContext,
    kind: ArtifactKind,
    project_dir: &Path,
) -> Vec<PublishUnit> {
    let dist = project_dir.join("dist");

    let sources: Vec<(std::path::PathBuf, &str)> = match kind {
        ArtifactKind::App if config.is_vite() => {
            vec![(dist.join(format!("{}.es.js", config.name)), JS_CONTENT_TYPE)]
        }
        ArtifactKind::App => {
            let mut files = vec![(dist.join("app.js"), JS_CONTENT_TYPE)];
            if config.css {
                files.push((dist.join("app.css"), CSS_CONTENT_TYPE));
            }
            files
        }
        ArtifactKind::Wizard => vec![
            (dist.join("app.js"), JS_CONTENT_TYPE),
            (dist.join("app.css"), CSS_CONTENT_TYPE),
        ],
        ArtifactKind::Misc => vec![(dist.join("app.js"), JS_CONTENT_TYPE)],
    };

    sources
        .into_iter()
        .map(|(source, content_type)| PublishUnit {
            destination: destination(
                &config.name,
                kind.suffix(),
                &ctx.effective_version,
                content_type,
            ),
            backup_name: backup_name(
                &ctx.timestamp,
                &config.name,
                kind.suffix(),
                &ctx.effective_version,
                content_type,
            ),
            content_type: content_type.to_string(),
            source,
        })
        .collect()
}
