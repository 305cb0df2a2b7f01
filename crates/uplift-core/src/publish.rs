//! Uploads and CDN invalidation.
//!
//! The object store and CDN are reached through the [`Transport`] seam;
//! production uses the `aws` CLI (the operator's existing credentials
//! and profiles apply), tests substitute an in-memory transport.
//!
//! Failure granularity is the whole artifact kind: a failed upload
//! empties that kind's changed set instead of returning a partial one,
//! so sibling files (script + stylesheet) are never invalidated as a
//! half-consistent pair.

use anyhow::Result;
use uplift_retry::RetryConfig;
use uplift_types::{ArtifactKind, PublishUnit, Target};

use crate::engine::Reporter;

/// Object-storage and CDN operations the pipeline needs.
pub trait Transport {
    /// Upload one file with public-read access and its content type.
    fn upload(&self, unit: &PublishUnit) -> Result<()>;

    /// Invalidate the given destination paths on the CDN.
    fn invalidate(&self, paths: &[String]) -> Result<()>;
}

/// Production transport shelling out to the `aws` CLI.
///
/// Both operations are idempotent, so transient failures are retried
/// with bounded backoff.
pub struct AwsCli {
    target: Target,
    retry: RetryConfig,
}

impl AwsCli {
    pub fn new(target: Target, retry: RetryConfig) -> Self {
        Self { target, retry }
    }
}

impl Transport for AwsCli {
    fn upload(&self, unit: &PublishUnit) -> Result<()> {
        let source = unit.source.to_string_lossy().to_string();
        let dest = format!("s3://{}{}", self.target.bucket, unit.destination);

        uplift_retry::run(&self.retry, || {
            let result = uplift_process::run_command(
                "aws",
                &[
                    "s3",
                    "cp",
                    &source,
                    &dest,
                    "--acl",
                    "public-read",
                    "--content-type",
                    &unit.content_type,
                    "--profile",
                    &self.target.aws_profile,
                ],
            )?;
            result.ok()?;
            Ok(())
        })
    }

    fn invalidate(&self, paths: &[String]) -> Result<()> {
        let mut args = vec![
            "cloudfront",
            "create-invalidation",
            "--distribution-id",
            &self.target.distribution_id,
            "--profile",
            &self.target.aws_profile,
            "--paths",
        ];
        args.extend(paths.iter().map(String::as_str));

        uplift_retry::run(&self.retry, || {
            let result = uplift_process::run_command("aws", &args)?;
            result.ok()?;
            Ok(())
        })
    }
}

/// Upload a kind's units in order and return the destinations uploaded.
///
/// On any failure the error is reported with the kind and the returned
/// changed set is empty, never partial.
pub fn publish_set(
    kind: ArtifactKind,
    units: &[PublishUnit],
    transport: &dyn Transport,
    reporter: &mut dyn Reporter,
) -> Vec<String> {
    let mut changed = Vec::with_capacity(units.len());

    for unit in units {
        reporter.info(&format!("{kind}: uploading {}", unit.destination));
        if let Err(err) = transport.upload(unit) {
            reporter.error(&format!(
                "{kind}: upload of {} failed: {err:#}",
                unit.destination
            ));
            return Vec::new();
        }
        changed.push(unit.destination.clone());
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use uplift_types::JS_CONTENT_TYPE;

    struct NullReporter;

    impl Reporter for NullReporter {
        fn info(&mut self, _msg: &str) {}
        fn warn(&mut self, _msg: &str) {}
        fn error(&mut self, _msg: &str) {}
    }

    struct FlakyTransport {
        uploads: RefCell<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    impl Transport for FlakyTransport {
        fn upload(&self, unit: &PublishUnit) -> Result<()> {
            if let Some(needle) = self.fail_containing {
                if unit.destination.contains(needle) {
                    anyhow::bail!("simulated upload failure");
                }
            }
            self.uploads.borrow_mut().push(unit.destination.clone());
            Ok(())
        }

        fn invalidate(&self, _paths: &[String]) -> Result<()> {
            Ok(())
        }
    }

    fn unit(destination: &str) -> PublishUnit {
        PublishUnit {
            source: PathBuf::from("dist/app.js"),
            destination: destination.into(),
            content_type: JS_CONTENT_TYPE.into(),
            backup_name: "b.js".into(),
        }
    }

    #[test]
    fn returns_destinations_in_order() {
        let transport = FlakyTransport {
            uploads: RefCell::new(Vec::new()),
            fail_containing: None,
        };
        let units = [unit("/scripts/wheel/v1.js"), unit("/scripts/wheel/v1.css")];

        let changed = publish_set(ArtifactKind::App, &units, &transport, &mut NullReporter);

        assert_eq!(changed, ["/scripts/wheel/v1.js", "/scripts/wheel/v1.css"]);
    }

    #[test]
    fn failure_empties_the_whole_set() {
        let transport = FlakyTransport {
            uploads: RefCell::new(Vec::new()),
            fail_containing: Some(".css"),
        };
        let units = [unit("/scripts/wheel/v1.js"), unit("/scripts/wheel/v1.css")];

        let changed = publish_set(ArtifactKind::App, &units, &transport, &mut NullReporter);

        // The script uploaded, but the kind's contribution is dropped
        // wholesale so a half-consistent pair is never invalidated.
        assert!(changed.is_empty());
        assert_eq!(transport.uploads.borrow().len(), 1);
    }
}
