//! Best-effort system clipboard access.
//!
//! The snippet lands on the clipboard for manual pasting into the host
//! CMS. There is no portable clipboard API worth a native dependency
//! here; shelling out to the platform tool matches how the rest of the
//! pipeline reaches its collaborators.

use anyhow::{Result, bail};

/// Platform clipboard tools, tried in order.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("wl-copy", &[]),
];

/// Place `text` on the system clipboard via the first available tool.
pub fn copy(text: &str) -> Result<()> {
    for (program, args) in CANDIDATES {
        if uplift_process::command_exists(program) {
            return uplift_process::pipe_to_command(program, args, text);
        }
    }
    bail!("no clipboard tool found (tried pbcopy, xclip, wl-copy)")
}
