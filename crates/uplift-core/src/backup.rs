//! Branch- and timestamp-scoped local snapshots of published files.
//!
//! Backups are a convenience, not a precondition for publishing: each
//! copy is independent, failures are reported and never block the
//! remaining copies or the upload stage. Copies are sequenced and
//! awaited so the pipeline cannot finish with snapshots still pending.

use std::fs;
use std::path::Path;

use uplift_types::PublishUnit;

use crate::engine::Reporter;

/// Root directory for local snapshots, relative to the project.
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Copy each unit into `snapshots/{branch}/{backup_name}`.
///
/// Returns the number of files archived. The branch label must already
/// be sanitized (see `uplift_git::sanitize_branch`).
pub fn archive_units(
    project_dir: &Path,
    branch: &str,
    units: &[PublishUnit],
    reporter: &mut dyn Reporter,
) -> usize {
    let dir = project_dir.join(SNAPSHOT_DIR).join(branch);
    let mut archived = 0;

    for unit in units {
        if let Err(err) = fs::create_dir_all(&dir) {
            reporter.warn(&format!(
                "failed to create backup directory {}: {err}",
                dir.display()
            ));
            continue;
        }

        let backup_path = dir.join(&unit.backup_name);
        match fs::copy(&unit.source, &backup_path) {
            Ok(_) => archived += 1,
            Err(err) => reporter.warn(&format!(
                "failed to back up {} to {}: {err}",
                unit.source.display(),
                backup_path.display()
            )),
        }
    }

    archived
}
