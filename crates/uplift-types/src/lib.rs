//! Core domain types for uplift.
//!
//! This crate provides the fundamental types used across the uplift
//! ecosystem: artifact kinds, publish units, the per-run version context,
//! the deploy target, and the receipt produced by a pipeline run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type of the primary script bundle.
pub const JS_CONTENT_TYPE: &str = "application/javascript";

/// Content type of stylesheet companions.
pub const CSS_CONTENT_TYPE: &str = "text/css";

/// The artifact families a template ships.
///
/// Each kind has its own build script and destination-path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The main script bundle (plus optional stylesheet).
    App,
    /// The builder-side wizard bundle (script + stylesheet).
    Wizard,
    /// The auxiliary misc bundle (script only).
    Misc,
}

impl ArtifactKind {
    /// Destination-path suffix, empty for the primary artifact.
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::App => "",
            ArtifactKind::Wizard => "wizard",
            ArtifactKind::Misc => "misc",
        }
    }

    /// Package script invoked to build this artifact.
    pub fn build_script(&self) -> &'static str {
        match self {
            ArtifactKind::App => "build",
            ArtifactKind::Wizard => "build:wizard",
            ArtifactKind::Misc => "build:misc",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::App => write!(f, "app"),
            ArtifactKind::Wizard => write!(f, "wizard"),
            ArtifactKind::Misc => write!(f, "misc"),
        }
    }
}

/// One physical file to publish, fully resolved.
///
/// Derived deterministically from the template config plus the version
/// context; constructed fresh each run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishUnit {
    /// Local build output to upload.
    pub source: PathBuf,
    /// Bucket key, e.g. `/scripts/wheel-wizard/v3.css`.
    pub destination: String,
    /// Content type sent with the upload.
    pub content_type: String,
    /// Human-readable archive filename, e.g. `20260826-101500-wheel-v3.js`.
    pub backup_name: String,
}

/// Per-run version resolution, computed once and passed into every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionContext {
    /// Explicit CLI version if given, else the config's `appVersion`.
    pub effective_version: String,
    /// Sanitized branch label used for backup paths (`feature/x` -> `feature_x`).
    pub source_branch: String,
    /// Backup generation stamp, `YYYYMMDD-HHMMSS`, captured once per run.
    pub timestamp: String,
    /// True iff no explicit CLI version was given. Controls cache
    /// invalidation and config persistence.
    pub is_default_publish: bool,
}

/// Object-storage bucket and CDN distribution the pipeline publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// S3 bucket holding the published bundles.
    pub bucket: String,
    /// CloudFront distribution to invalidate.
    pub distribution_id: String,
    /// Public CDN base URL embedded in the loader snippet.
    pub cdn_url: String,
    /// AWS CLI profile used for uploads and invalidations.
    pub aws_profile: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            bucket: "template-assets.shortstack.com".to_string(),
            distribution_id: "E3I8BZ6ZUCKW10".to_string(),
            cdn_url: "https://d1m2uzvk8r2fcn.cloudfront.net".to_string(),
            aws_profile: "shortstack".to_string(),
        }
    }
}

/// A pipeline stage, for receipts and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// External build command for one artifact kind.
    Build { kind: ArtifactKind },
    /// Local snapshot copies for one artifact kind.
    Backup { kind: ArtifactKind },
    /// Uploads for one artifact kind.
    Publish { kind: ArtifactKind },
    /// CDN invalidation of the changed set.
    Invalidate,
    /// Version write-back into the deploy config.
    Persist,
    /// Loader snippet generation.
    Snippet,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Build { kind } => write!(f, "build({kind})"),
            Stage::Backup { kind } => write!(f, "backup({kind})"),
            Stage::Publish { kind } => write!(f, "publish({kind})"),
            Stage::Invalidate => write!(f, "invalidate"),
            Stage::Persist => write!(f, "persist"),
            Stage::Snippet => write!(f, "snippet"),
        }
    }
}

/// Outcome of one pipeline stage. Stages fail independently; the
/// receipt aggregates them instead of aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    #[serde(flatten)]
    pub stage: Stage,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageOutcome {
    pub fn ok(stage: Stage) -> Self {
        Self {
            stage,
            ok: true,
            detail: None,
        }
    }

    pub fn ok_with(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            ok: true,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// What a pipeline run did, stage by stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReceipt {
    /// Template name from the deploy config.
    pub template: String,
    /// Version that was published.
    pub version: String,
    /// False for side/preview publishes.
    pub default_publish: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Stage outcomes in execution order.
    pub stages: Vec<StageOutcome>,
    /// Destination paths actually uploaded this run.
    pub changed_paths: Vec<String>,
    /// Whether a CDN invalidation was issued.
    pub invalidated: bool,
    /// Whether the deploy config was rewritten.
    pub persisted: bool,
}

impl DeployReceipt {
    /// True iff every stage succeeded. The CLI exits non-zero otherwise.
    pub fn all_ok(&self) -> bool {
        self.stages.iter().all(|s| s.ok)
    }

    /// Stages that failed, in execution order.
    pub fn failed_stages(&self) -> Vec<&StageOutcome> {
        self.stages.iter().filter(|s| !s.ok).collect()
    }
}
