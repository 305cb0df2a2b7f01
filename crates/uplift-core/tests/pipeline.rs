//! End-to-end pipeline runs against an in-memory transport.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use uplift_core::engine::{DeployOptions, Reporter, run_deploy};
use uplift_core::publish::Transport;
use uplift_core::snippet::SNIPPET_FILE;
use uplift_types::{PublishUnit, Target};

#[derive(Default)]
struct RecordingTransport {
    uploads: RefCell<Vec<String>>,
    invalidations: RefCell<Vec<Vec<String>>>,
    fail_containing: Option<&'static str>,
}

impl Transport for RecordingTransport {
    fn upload(&self, unit: &PublishUnit) -> Result<()> {
        if let Some(needle) = self.fail_containing {
            if unit.destination.contains(needle) {
                anyhow::bail!("simulated upload failure");
            }
        }
        self.uploads.borrow_mut().push(unit.destination.clone());
        Ok(())
    }

    fn invalidate(&self, paths: &[String]) -> Result<()> {
        self.invalidations.borrow_mut().push(paths.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingReporter {
    messages: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn info(&mut self, msg: &str) {
        self.messages.push(format!("[info] {msg}"));
    }
    fn warn(&mut self, msg: &str) {
        self.messages.push(format!("[warn] {msg}"));
    }
    fn error(&mut self, msg: &str) {
        self.messages.push(format!("[error] {msg}"));
    }
}

const WHEEL_CONFIG: &str = r#"module.exports = {
  "name": "wheel",
  "css": true,
  "scriptVersion": "app",
  "appVersion": "v1",
  "scriptLoaderVersion": "7"
}"#;

fn project_with_config(config: &str) -> (TempDir, PathBuf) {
    let td = TempDir::new().expect("tempdir");
    let dist = td.path().join("dist");
    fs::create_dir_all(&dist).expect("create dist");
    fs::write(dist.join("app.js"), "console.log('app')").expect("write app.js");
    fs::write(dist.join("app.css"), "body {}").expect("write app.css");

    let config_path = td.path().join("deploy.config.js");
    fs::write(&config_path, config).expect("write config");
    (td, config_path)
}

fn options(project_dir: &Path, config_path: &Path, version: Option<&str>) -> DeployOptions {
    DeployOptions {
        project_dir: project_dir.to_path_buf(),
        config_path: config_path.to_path_buf(),
        cli_version: version.map(str::to_string),
        // Builds shell out to the package runner; the pipeline under
        // test publishes the prebuilt dist/ fixtures instead.
        skip_build: true,
        skip_backup: false,
    }
}

#[test]
fn default_publish_uploads_invalidates_and_persists() {
    let (td, config_path) = project_with_config(WHEEL_CONFIG);
    let transport = RecordingTransport::default();
    let mut reporter = CollectingReporter::default();

    let receipt = run_deploy(
        &options(td.path(), &config_path, None),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .expect("run");

    assert_eq!(
        *transport.uploads.borrow(),
        ["/scripts/wheel/v1.js", "/scripts/wheel/v1.css"]
    );

    // Exactly one invalidation covering the whole changed set.
    let invalidations = transport.invalidations.borrow();
    assert_eq!(invalidations.len(), 1);
    assert_eq!(
        invalidations[0],
        ["/scripts/wheel/v1.js", "/scripts/wheel/v1.css"]
    );

    assert!(receipt.default_publish);
    assert!(receipt.invalidated);
    assert!(receipt.persisted);
    assert!(receipt.all_ok(), "failed stages: {:?}", receipt.failed_stages());

    // Republishing the default version leaves appVersion at v1.
    let record = uplift_config::load_raw(&config_path).expect("reload config");
    assert_eq!(record["appVersion"], "v1");

    // Snippet generated, without a misc tag.
    let snippet = fs::read_to_string(td.path().join(SNIPPET_FILE)).expect("read snippet");
    assert!(!snippet.contains("-misc/"));
    assert!(snippet.contains("appVersion: 'v1',"));
}

#[test]
fn side_publish_skips_invalidation_and_persistence() {
    let (td, config_path) = project_with_config(WHEEL_CONFIG);
    let transport = RecordingTransport::default();
    let mut reporter = CollectingReporter::default();

    let receipt = run_deploy(
        &options(td.path(), &config_path, Some("v2-preview")),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .expect("run");

    assert_eq!(
        *transport.uploads.borrow(),
        [
            "/scripts/wheel/v2-preview.js",
            "/scripts/wheel/v2-preview.css"
        ]
    );
    assert!(transport.invalidations.borrow().is_empty());

    assert!(!receipt.default_publish);
    assert!(!receipt.invalidated);
    assert!(!receipt.persisted);

    // Persisted config untouched by a preview publish.
    let record = uplift_config::load_raw(&config_path).expect("reload config");
    assert_eq!(record["appVersion"], "v1");
}

#[test]
fn failed_kind_drops_only_its_own_contribution() {
    let config = r#"module.exports = {
  "name": "wheel",
  "css": true,
  "scriptVersion": "app",
  "appVersion": "v1",
  "miscVersion": "v1"
}"#;
    let (td, config_path) = project_with_config(config);
    let transport = RecordingTransport {
        fail_containing: Some("-misc"),
        ..Default::default()
    };
    let mut reporter = CollectingReporter::default();

    let receipt = run_deploy(
        &options(td.path(), &config_path, None),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .expect("run");

    // The misc failure is isolated: the primary set still publishes
    // and still gets invalidated.
    assert_eq!(
        receipt.changed_paths,
        ["/scripts/wheel/v1.js", "/scripts/wheel/v1.css"]
    );
    assert_eq!(transport.invalidations.borrow().len(), 1);
    assert!(!receipt.all_ok());
    assert_eq!(receipt.failed_stages().len(), 1);
}

#[test]
fn backups_land_under_branch_directory() {
    let (td, config_path) = project_with_config(WHEEL_CONFIG);
    let transport = RecordingTransport::default();
    let mut reporter = CollectingReporter::default();

    let receipt = run_deploy(
        &options(td.path(), &config_path, None),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .expect("run");

    // The temp dir is not a git repository, so the archiver falls back
    // to the "unknown" branch label.
    let snapshot_dir = td.path().join("snapshots").join("unknown");
    let backups: Vec<String> = fs::read_dir(&snapshot_dir)
        .expect("snapshot dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(backups.len(), 2);
    assert!(backups.iter().all(|b| b.contains("-wheel-v1.")));
    assert!(receipt.all_ok(), "failed stages: {:?}", receipt.failed_stages());
}

#[test]
fn missing_name_aborts_the_run() {
    let (td, config_path) = project_with_config("module.exports = {\"css\": true}");
    let transport = RecordingTransport::default();
    let mut reporter = CollectingReporter::default();

    let err = run_deploy(
        &options(td.path(), &config_path, None),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .unwrap_err();

    assert!(err.to_string().contains("name"));
    assert!(transport.uploads.borrow().is_empty());
}

#[test]
fn vite_config_publishes_single_file_bundle() {
    let config = r#"module.exports = {
  "name": "wheel",
  "scriptVersion": "vite",
  "appVersion": "v1"
}"#;
    let (td, config_path) = project_with_config(config);
    fs::write(td.path().join("dist").join("wheel.es.js"), "export {}").expect("write es bundle");

    let transport = RecordingTransport::default();
    let mut reporter = CollectingReporter::default();

    run_deploy(
        &options(td.path(), &config_path, None),
        &Target::default(),
        &transport,
        &mut reporter,
    )
    .expect("run");

    assert_eq!(*transport.uploads.borrow(), ["/scripts/wheel/v1.js"]);
}
